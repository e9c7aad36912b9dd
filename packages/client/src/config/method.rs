//! Per-method protocol parameters
//!
//! Every field is optional so parameter sets can be layered: a method's own
//! settings are consulted first, then its host's, then the client's, then the
//! global defaults. Resolved getters supply the built-in default when no layer
//! sets a value.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::auth::CredentialsProvider;
use crate::cookie::CookiePolicy;
use crate::http::HttpVersion;
use crate::retry::{DefaultMethodRetryHandler, MethodRetryHandler};

/// Protocol parameters consulted while a single method executes.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodParams {
    /// HTTP version written on the request line
    pub version: Option<HttpVersion>,
    /// Value of the generated `User-Agent` header
    pub user_agent: Option<String>,
    /// Reject declared-but-absent chunked bodies and unknown transfer codings
    pub strict_transfer_encoding: Option<bool>,
    /// Reject status lines that omit the protocol version
    pub unambiguous_status_line: Option<bool>,
    /// Number of garbage lines tolerated before the status line
    pub status_line_garbage_limit: Option<usize>,
    /// Send `Expect: 100-continue` ahead of request bodies
    pub use_expect_continue: Option<bool>,
    /// How long to wait for a provisional `100 Continue`
    pub continue_timeout: Option<Duration>,
    /// Merge all cookies into one `Cookie` header
    pub single_cookie_header: Option<bool>,
    /// Cookie matching and parsing policy
    pub cookie_policy: Option<CookiePolicy>,
    /// Socket read timeout applied while this method executes
    pub socket_timeout: Option<Duration>,
    /// Host name used for the `Host` header and auth scopes instead of the connection host
    pub virtual_host: Option<String>,
    /// Redirect hop budget
    pub max_redirects: Option<u32>,
    /// Refuse relative `Location` values
    pub reject_relative_redirect: Option<bool>,
    /// Allow redirects back to an already visited location
    pub allow_circular_redirects: Option<bool>,
    /// Auth scheme names in order of preference
    pub auth_scheme_priority: Option<Vec<String>>,
    /// Log a warning when bytes follow the end of a response body
    pub warn_extra_input: Option<bool>,
    #[serde(skip)]
    pub retry_handler: Option<Arc<dyn MethodRetryHandler>>,
    #[serde(skip)]
    pub credentials_provider: Option<Arc<dyn CredentialsProvider>>,
}

impl fmt::Debug for MethodParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodParams")
            .field("version", &self.version)
            .field("user_agent", &self.user_agent)
            .field("strict_transfer_encoding", &self.strict_transfer_encoding)
            .field("unambiguous_status_line", &self.unambiguous_status_line)
            .field("status_line_garbage_limit", &self.status_line_garbage_limit)
            .field("use_expect_continue", &self.use_expect_continue)
            .field("continue_timeout", &self.continue_timeout)
            .field("single_cookie_header", &self.single_cookie_header)
            .field("cookie_policy", &self.cookie_policy)
            .field("socket_timeout", &self.socket_timeout)
            .field("virtual_host", &self.virtual_host)
            .field("max_redirects", &self.max_redirects)
            .field("reject_relative_redirect", &self.reject_relative_redirect)
            .field("allow_circular_redirects", &self.allow_circular_redirects)
            .field("auth_scheme_priority", &self.auth_scheme_priority)
            .field("retry_handler", &self.retry_handler.is_some())
            .field("credentials_provider", &self.credentials_provider.is_some())
            .finish()
    }
}

macro_rules! inherit_fields {
    ($self:ident, $defaults:ident, $($field:ident),+ $(,)?) => {
        $(
            if $self.$field.is_none() {
                $self.$field = $defaults.$field.clone();
            }
        )+
    };
}

impl MethodParams {
    /// Empty parameter set; every getter falls through to the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict protocol conformance: malformed framing and status lines are errors.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict_transfer_encoding: Some(true),
            unambiguous_status_line: Some(true),
            status_line_garbage_limit: Some(0),
            ..Self::default()
        }
    }

    /// Fill every unset field from `defaults`. Values already set here win.
    pub fn inherit(&mut self, defaults: &MethodParams) {
        inherit_fields!(
            self,
            defaults,
            version,
            user_agent,
            strict_transfer_encoding,
            unambiguous_status_line,
            status_line_garbage_limit,
            use_expect_continue,
            continue_timeout,
            single_cookie_header,
            cookie_policy,
            socket_timeout,
            virtual_host,
            max_redirects,
            reject_relative_redirect,
            allow_circular_redirects,
            auth_scheme_priority,
            warn_extra_input,
            retry_handler,
            credentials_provider,
        );
    }

    /// Layer this parameter set over a chain of defaults, nearest first.
    #[must_use]
    pub fn layered<'a>(&self, chain: impl IntoIterator<Item = &'a MethodParams>) -> MethodParams {
        let mut resolved = self.clone();
        for defaults in chain {
            resolved.inherit(defaults);
        }
        resolved.inherit(defaults::global_params());
        resolved
    }

    pub fn with_version(mut self, version: HttpVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn with_strict_transfer_encoding(mut self, strict: bool) -> Self {
        self.strict_transfer_encoding = Some(strict);
        self
    }

    pub fn with_status_line_garbage_limit(mut self, limit: usize) -> Self {
        self.status_line_garbage_limit = Some(limit);
        self
    }

    pub fn with_expect_continue(mut self, enabled: bool) -> Self {
        self.use_expect_continue = Some(enabled);
        self
    }

    pub fn with_continue_timeout(mut self, timeout: Duration) -> Self {
        self.continue_timeout = Some(timeout);
        self
    }

    pub fn with_single_cookie_header(mut self, single: bool) -> Self {
        self.single_cookie_header = Some(single);
        self
    }

    pub fn with_cookie_policy(mut self, policy: CookiePolicy) -> Self {
        self.cookie_policy = Some(policy);
        self
    }

    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = Some(timeout);
        self
    }

    pub fn with_virtual_host(mut self, host: impl Into<String>) -> Self {
        self.virtual_host = Some(host.into());
        self
    }

    pub fn with_max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = Some(max);
        self
    }

    pub fn with_reject_relative_redirect(mut self, reject: bool) -> Self {
        self.reject_relative_redirect = Some(reject);
        self
    }

    pub fn with_allow_circular_redirects(mut self, allow: bool) -> Self {
        self.allow_circular_redirects = Some(allow);
        self
    }

    pub fn with_auth_scheme_priority<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auth_scheme_priority = Some(schemes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_retry_handler(mut self, handler: Arc<dyn MethodRetryHandler>) -> Self {
        self.retry_handler = Some(handler);
        self
    }

    pub fn with_credentials_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials_provider = Some(provider);
        self
    }

    // Resolved getters

    #[must_use]
    pub fn version(&self) -> HttpVersion {
        self.version.unwrap_or(HttpVersion::HTTP_1_1)
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(defaults::USER_AGENT)
    }

    #[must_use]
    pub fn is_strict_transfer_encoding(&self) -> bool {
        self.strict_transfer_encoding.unwrap_or(false)
    }

    #[must_use]
    pub fn is_unambiguous_status_line(&self) -> bool {
        self.unambiguous_status_line.unwrap_or(false)
    }

    #[must_use]
    pub fn status_line_garbage_limit(&self) -> usize {
        self.status_line_garbage_limit.unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn is_expect_continue(&self) -> bool {
        self.use_expect_continue.unwrap_or(false)
    }

    #[must_use]
    pub fn continue_timeout(&self) -> Duration {
        self.continue_timeout.unwrap_or(defaults::CONTINUE_TIMEOUT)
    }

    #[must_use]
    pub fn is_single_cookie_header(&self) -> bool {
        self.single_cookie_header.unwrap_or(false)
    }

    #[must_use]
    pub fn cookie_policy(&self) -> CookiePolicy {
        self.cookie_policy.unwrap_or_default()
    }

    #[must_use]
    pub fn max_redirects(&self) -> u32 {
        self.max_redirects.unwrap_or(defaults::MAX_REDIRECTS)
    }

    #[must_use]
    pub fn is_reject_relative_redirect(&self) -> bool {
        self.reject_relative_redirect.unwrap_or(false)
    }

    #[must_use]
    pub fn is_allow_circular_redirects(&self) -> bool {
        self.allow_circular_redirects.unwrap_or(false)
    }

    #[must_use]
    pub fn is_warn_extra_input(&self) -> bool {
        self.warn_extra_input.unwrap_or(false)
    }

    /// The configured retry handler, or the stock three-attempt handler.
    #[must_use]
    pub fn retry_handler(&self) -> Arc<dyn MethodRetryHandler> {
        self.retry_handler
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultMethodRetryHandler::default()))
    }
}
