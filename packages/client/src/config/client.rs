//! Client-wide parameters
//!
//! The client layer sits between host parameters and the global defaults in
//! the method parameter chain, and adds the settings that only the director
//! consults: pool acquisition timeout, preemptive authentication and the
//! tunnel authentication bound.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;
use super::method::MethodParams;
use crate::auth::CredentialsKind;

/// Parameters shared by every method a client executes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientParams {
    /// Method parameter defaults for this client
    pub method: MethodParams,
    /// How long `execute_method` may block waiting for a pooled connection; `None` waits forever
    pub connection_manager_timeout: Option<Duration>,
    /// Credential kinds that may be sent before any challenge, in order of preference
    pub preemptive_auth: Vec<CredentialsKind>,
    /// Proxy authentication round-trips allowed while opening a tunnel
    pub max_tunnel_auth_attempts: Option<u32>,
}

impl ClientParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method_params(mut self, params: MethodParams) -> Self {
        self.method = params;
        self
    }

    /// Set the pool acquisition timeout
    ///
    /// # Examples
    /// ```no_run
    /// use std::time::Duration;
    /// use tether_client::config::ClientParams;
    ///
    /// let params = ClientParams::new()
    ///     .with_connection_manager_timeout(Duration::from_millis(500));
    /// assert_eq!(params.connection_manager_timeout, Some(Duration::from_millis(500)));
    /// ```
    pub fn with_connection_manager_timeout(mut self, timeout: Duration) -> Self {
        self.connection_manager_timeout = Some(timeout);
        self
    }

    /// Send username/password credentials before the first challenge.
    pub fn with_preemptive_authentication(mut self, enabled: bool) -> Self {
        self.preemptive_auth = if enabled {
            vec![CredentialsKind::UsernamePassword]
        } else {
            Vec::new()
        };
        self
    }

    /// Restrict preemptive authentication to the listed credential kinds.
    pub fn with_preemptive_auth_kinds(mut self, kinds: impl IntoIterator<Item = CredentialsKind>) -> Self {
        self.preemptive_auth = kinds.into_iter().collect();
        self
    }

    pub fn with_max_tunnel_auth_attempts(mut self, attempts: u32) -> Self {
        self.max_tunnel_auth_attempts = Some(attempts);
        self
    }

    #[must_use]
    pub fn is_authentication_preemptive(&self) -> bool {
        !self.preemptive_auth.is_empty()
    }

    #[must_use]
    pub fn permits_preemptive(&self, kind: CredentialsKind) -> bool {
        self.preemptive_auth.contains(&kind)
    }

    #[must_use]
    pub fn max_tunnel_auth_attempts(&self) -> u32 {
        self.max_tunnel_auth_attempts
            .unwrap_or(defaults::MAX_TUNNEL_AUTH_ATTEMPTS)
    }
}
