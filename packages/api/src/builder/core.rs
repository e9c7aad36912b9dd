//! Core `Tether` builder structures and base functionality
//!
//! Contains the `Tether` struct, its body state markers and the settings
//! that apply to every request regardless of verb.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use tether_client::auth::Credentials;
use tether_client::{Error, HttpClient, MethodParams};

/// Content type enumeration for the common request bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// application/json content type
    ApplicationJson,
    /// application/x-www-form-urlencoded content type
    ApplicationFormUrlEncoded,
    /// application/octet-stream content type
    ApplicationOctetStream,
    /// text/plain content type
    TextPlain,
    /// text/html content type
    TextHtml,
}

impl ContentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::ApplicationJson => "application/json",
            ContentType::ApplicationFormUrlEncoded => "application/x-www-form-urlencoded",
            ContentType::ApplicationOctetStream => "application/octet-stream",
            ContentType::TextPlain => "text/plain",
            ContentType::TextHtml => "text/html",
        }
    }
}

/// State marker indicating no body has been set
#[derive(Debug, Clone, Copy)]
pub struct BodyNotSet;

/// State marker indicating a body has been set
#[derive(Debug, Clone, Copy)]
pub struct BodySet;

/// The bytes of a request body and what they are.
#[derive(Debug, Clone)]
pub(crate) struct Payload {
    pub(crate) content: Bytes,
    pub(crate) content_type: Option<String>,
}

/// Fluent request builder.
///
/// Type parameter `S` tracks the body state:
/// - `BodyNotSet`: default state, body methods available
/// - `BodySet`: a body has been set, only verbs remain
///
/// Invalid input does not interrupt the chain; the first problem is kept
/// and returned by the verb.
pub struct Tether<S = BodyNotSet> {
    pub(crate) client: HttpClient,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) params: MethodParams,
    pub(crate) payload: Option<Payload>,
    pub(crate) follow_redirects: Option<bool>,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) preemptive: bool,
    pub(crate) error: Option<Error>,
    pub(crate) debug_enabled: bool,
    pub(crate) state: S,
}

impl Tether<BodyNotSet> {
    /// Start a request on the process-wide client.
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(&tether_client::global_client())
    }

    /// Start a request on `client`, sharing its pool, state and statistics.
    #[must_use]
    pub fn with_client(client: &HttpClient) -> Self {
        Self {
            client: client.clone(),
            headers: Vec::new(),
            params: MethodParams::new(),
            payload: None,
            follow_redirects: None,
            credentials: None,
            preemptive: false,
            error: None,
            debug_enabled: false,
            state: BodyNotSet,
        }
    }

    /// Shorthand for a builder that sends and accepts JSON
    #[must_use]
    pub fn json_api() -> Self {
        Self::new()
            .content_type(ContentType::ApplicationJson)
            .accept(ContentType::ApplicationJson)
    }
}

impl Default for Tether<BodyNotSet> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Tether<S> {
    /// Log the request line and outcome at debug level
    #[must_use]
    pub fn debug(mut self) -> Self {
        self.debug_enabled = true;
        self
    }

    /// Socket timeout for every read and write of this request
    ///
    /// # Examples
    /// ```no_run
    /// use std::time::Duration;
    /// use tether::Tether;
    ///
    /// let response = Tether::new()
    ///     .timeout(Duration::from_secs(30))
    ///     .get("http://api.example.com/data");
    /// ```
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.params = self.params.with_socket_timeout(timeout);
        self
    }

    /// Follow redirects automatically.
    ///
    /// GET and HEAD follow them by default. Entity enclosing verbs refuse
    /// automatic redirects; asking for them fails the request.
    #[must_use]
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    /// Replace the method parameters of this request
    #[must_use]
    pub fn params(mut self, params: MethodParams) -> Self {
        self.params = params;
        self
    }

    pub(crate) fn fail(mut self, error: Error) -> Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }

    /// Move every setting into a builder with a different body state.
    pub(crate) fn into_state<T>(self, state: T) -> Tether<T> {
        Tether {
            client: self.client,
            headers: self.headers,
            params: self.params,
            payload: self.payload,
            follow_redirects: self.follow_redirects,
            credentials: self.credentials,
            preemptive: self.preemptive,
            error: self.error,
            debug_enabled: self.debug_enabled,
            state,
        }
    }
}

impl<S> fmt::Debug for Tether<S>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tether")
            .field("client", &self.client)
            .field("headers", &self.headers)
            .field("body", &self.payload.as_ref().map(|p| p.content.len()))
            .field("follow_redirects", &self.follow_redirects)
            .field("credentials", &self.credentials.is_some())
            .field("preemptive", &self.preemptive)
            .field("error", &self.error)
            .field("state", &self.state)
            .finish()
    }
}
