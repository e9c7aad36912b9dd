//! Request body handling
//!
//! Every body is buffered, so it can be resent when a request is retried
//! or answered with an authentication challenge.

use bytes::Bytes;
use serde::Serialize;
use tether_client::error;

use crate::builder::core::{BodyNotSet, BodySet, ContentType, Payload, Tether};

impl Tether<BodyNotSet> {
    /// Set raw bytes as request body
    ///
    /// The `Content-Type` header, if set, describes the bytes; otherwise
    /// `application/octet-stream` is sent.
    #[must_use]
    pub fn body(self, bytes: impl Into<Bytes>) -> Tether<BodySet> {
        let content_type = if self.has_header("content-type") {
            None
        } else {
            Some(ContentType::ApplicationOctetStream)
        };
        self.with_payload(bytes.into(), content_type)
    }

    /// Set UTF-8 text as request body
    ///
    /// # Examples
    /// ```no_run
    /// use tether::Tether;
    ///
    /// let response = Tether::new()
    ///     .text("Hello, World!")
    ///     .post("http://api.example.com/messages");
    /// ```
    #[must_use]
    pub fn text(self, text: &str) -> Tether<BodySet> {
        let content_type = if self.has_header("content-type") {
            None
        } else {
            Some(ContentType::TextPlain)
        };
        self.with_payload(Bytes::copy_from_slice(text.as_bytes()), content_type)
    }

    /// Serialize `body` as the JSON request body
    ///
    /// # Examples
    /// ```no_run
    /// use serde::Serialize;
    /// use tether::Tether;
    ///
    /// #[derive(Serialize)]
    /// struct User {
    ///     name: String,
    /// }
    ///
    /// let user = User { name: "John Doe".to_string() };
    /// let response = Tether::new()
    ///     .json(&user)
    ///     .post("http://api.example.com/users");
    /// ```
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Tether<BodySet> {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.with_payload(Bytes::from(bytes), Some(ContentType::ApplicationJson)),
            Err(e) => self
                .fail(error::builder(e))
                .into_state(BodySet),
        }
    }

    /// Serialize `body` as an `application/x-www-form-urlencoded` request body
    #[must_use]
    pub fn form<T: Serialize + ?Sized>(self, body: &T) -> Tether<BodySet> {
        match serde_urlencoded::to_string(body) {
            Ok(encoded) => self.with_payload(
                Bytes::from(encoded.into_bytes()),
                Some(ContentType::ApplicationFormUrlEncoded),
            ),
            Err(e) => self
                .fail(error::builder(e))
                .into_state(BodySet),
        }
    }

    fn with_payload(self, content: Bytes, content_type: Option<ContentType>) -> Tether<BodySet> {
        let builder = match content_type {
            Some(content_type) => self.content_type(content_type),
            None => self,
        };
        if builder.debug_enabled {
            tracing::debug!("Tether: set request body ({} bytes)", content.len());
        }
        let content_type = builder
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.clone());
        let mut builder = builder.into_state(BodySet);
        builder.payload = Some(Payload { content, content_type });
        builder
    }
}
