//! Method retry policy
//!
//! Decides whether a method that failed with a transport error is executed
//! again on a fresh connection, and how long to wait first.

use std::fmt;
use std::time::Duration;

use crate::error::Error;
use crate::method::HttpMethod;

/// Base of the default exponential backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(10_000);

/// Decides whether a failed execution is attempted again.
pub trait MethodRetryHandler: Send + Sync + fmt::Debug {
    /// `execution_count` is the number of executions so far, including the
    /// one that just failed.
    fn retry_method(&self, method: &HttpMethod, error: &Error, execution_count: u32) -> bool;

    /// Pause before execution number `execution_count + 1`.
    fn backoff(&self, execution_count: u32) -> Duration {
        exponential_backoff(DEFAULT_BACKOFF_BASE, execution_count)
    }
}

/// `base * 2^(n-1)`, saturating.
#[must_use]
pub fn exponential_backoff(base: Duration, execution_count: u32) -> Duration {
    let exponent = execution_count.saturating_sub(1).min(31);
    base.saturating_mul(1u32 << exponent)
}

/// Retries transport failures a bounded number of times.
///
/// A dropped connection with no response at all is always retried; other
/// failures only if the request never went out, unless retrying sent
/// requests is enabled. Timeouts, unknown hosts, unreachable networks and
/// TLS handshake failures are never retried.
#[derive(Debug, Clone)]
pub struct DefaultMethodRetryHandler {
    retry_count: u32,
    request_sent_retry_enabled: bool,
    backoff_base: Duration,
}

impl Default for DefaultMethodRetryHandler {
    fn default() -> Self {
        Self {
            retry_count: 3,
            request_sent_retry_enabled: false,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl DefaultMethodRetryHandler {
    #[must_use]
    pub fn new(retry_count: u32, request_sent_retry_enabled: bool) -> Self {
        Self {
            retry_count,
            request_sent_retry_enabled,
            ..Self::default()
        }
    }

    /// Single attempt only.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(0, false)
    }

    #[must_use]
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    #[must_use]
    pub fn is_request_sent_retry_enabled(&self) -> bool {
        self.request_sent_retry_enabled
    }
}

impl MethodRetryHandler for DefaultMethodRetryHandler {
    fn retry_method(&self, method: &HttpMethod, error: &Error, execution_count: u32) -> bool {
        if method.is_aborted() || execution_count > self.retry_count {
            return false;
        }
        if error.is_no_response() {
            return true;
        }
        if !error.is_transport()
            || error.is_timeout()
            || error.is_unknown_host()
            || error.is_no_route()
            || error.is_tls_handshake()
        {
            return false;
        }
        !method.is_request_sent() || self.request_sent_retry_enabled
    }

    fn backoff(&self, execution_count: u32) -> Duration {
        exponential_backoff(self.backoff_base, execution_count)
    }
}
