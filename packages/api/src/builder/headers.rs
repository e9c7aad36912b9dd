//! Header management
//!
//! Headers set here are sent as given. Headers the engine generates
//! (`Host`, `Content-Length`, `Cookie`, ...) are replaced on every attempt.

use http::{HeaderName, HeaderValue};
use tether_client::error;

use crate::builder::core::{ContentType, Tether};

/// Header constants for common HTTP headers
pub mod header {
    pub use http::header::*;
}

impl<S> Tether<S> {
    /// Add a header to the request
    ///
    /// # Examples
    /// ```no_run
    /// use http::{HeaderName, HeaderValue};
    /// use tether::Tether;
    ///
    /// let response = Tether::new()
    ///     .header(
    ///         HeaderName::from_static("x-custom-header"),
    ///         HeaderValue::from_static("custom-value"),
    ///     )
    ///     .get("http://api.example.com/data");
    /// ```
    #[must_use]
    pub fn header(mut self, key: HeaderName, value: HeaderValue) -> Self {
        match value.to_str() {
            Ok(text) => {
                self.headers.push((key.as_str().to_string(), text.to_string()));
                self
            }
            Err(e) => {
                tracing::warn!("Header {} is not visible ASCII: {}", key, e);
                self.fail(error::builder(format!("invalid value for header {key}")))
            }
        }
    }

    /// Add several headers without overwriting existing ones
    ///
    /// # Examples
    /// ```no_run
    /// use tether::Tether;
    ///
    /// let response = Tether::new()
    ///     .headers([("user-agent", "MyApp/1.0"), ("x-api-version", "v1")])
    ///     .get("http://api.example.com/data");
    /// ```
    #[must_use]
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in headers {
            let (key, value) = (key.as_ref(), value.as_ref());
            if HeaderName::from_bytes(key.as_bytes()).is_err() || HeaderValue::from_str(value).is_err() {
                tracing::warn!("Skipping invalid header {:?}", key);
                continue;
            }
            self.headers.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// Set the `Content-Type` header
    #[must_use]
    pub fn content_type(self, content_type: ContentType) -> Self {
        let mut builder = self.without_header(header::CONTENT_TYPE.as_str());
        builder
            .headers
            .push(("Content-Type".to_string(), content_type.as_str().to_string()));
        builder
    }

    /// Set the `Accept` header
    #[must_use]
    pub fn accept(self, content_type: ContentType) -> Self {
        let mut builder = self.without_header(header::ACCEPT.as_str());
        builder
            .headers
            .push(("Accept".to_string(), content_type.as_str().to_string()));
        builder
    }

    pub(crate) fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    fn without_header(mut self, name: &str) -> Self {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self
    }
}
