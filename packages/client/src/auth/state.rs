//! Per-method authentication progress

use std::fmt;

use super::basic_auth::BasicScheme;
use super::scheme::AuthScheme;

/// Tracks one authentication exchange (host or proxy) for a method.
#[derive(Default)]
pub struct AuthState {
    scheme: Option<Box<dyn AuthScheme>>,
    requested: bool,
    attempted: bool,
    preemptive: bool,
}

impl AuthState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the scheme and every flag.
    pub fn invalidate(&mut self) {
        self.scheme = None;
        self.requested = false;
        self.attempted = false;
        self.preemptive = false;
    }

    #[must_use]
    pub fn is_auth_requested(&self) -> bool {
        self.requested
    }

    pub fn set_auth_requested(&mut self, requested: bool) {
        self.requested = requested;
    }

    #[must_use]
    pub fn is_auth_attempted(&self) -> bool {
        self.attempted
    }

    pub fn set_auth_attempted(&mut self, attempted: bool) {
        self.attempted = attempted;
    }

    /// Send Basic credentials before any challenge. Has no effect once a
    /// scheme was chosen from a real challenge.
    pub fn set_preemptive(&mut self) {
        if self.preemptive {
            return;
        }
        if self.scheme.is_some() {
            tracing::debug!("Authentication scheme already chosen; not switching to preemptive");
            return;
        }
        self.scheme = Some(Box::new(BasicScheme::new()));
        self.preemptive = true;
    }

    #[must_use]
    pub fn is_preemptive(&self) -> bool {
        self.preemptive
    }

    /// Replace the scheme. A scheme of a different kind resets the
    /// attempted and preemptive flags; `None` invalidates the state.
    pub fn set_scheme(&mut self, scheme: Option<Box<dyn AuthScheme>>) {
        let Some(scheme) = scheme else {
            self.invalidate();
            return;
        };
        if let Some(current) = &self.scheme
            && current.scheme_name() != scheme.scheme_name()
        {
            self.preemptive = false;
            self.attempted = false;
        }
        self.scheme = Some(scheme);
    }

    #[must_use]
    pub fn scheme(&self) -> Option<&dyn AuthScheme> {
        self.scheme.as_deref()
    }

    pub fn scheme_mut(&mut self) -> Option<&mut Box<dyn AuthScheme>> {
        self.scheme.as_mut()
    }

    #[must_use]
    pub fn realm(&self) -> Option<&str> {
        self.scheme.as_ref().and_then(|s| s.realm())
    }
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("scheme", &self.scheme.as_ref().map(|s| s.scheme_name()))
            .field("requested", &self.requested)
            .field("attempted", &self.attempted)
            .field("preemptive", &self.preemptive)
            .finish()
    }
}
