//! Response wrapper
//!
//! Owns the executed method. The body stays on the connection until one of
//! the consuming accessors reads it; dropping the response releases the
//! connection.

use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tether_client::http::{HeaderGroup, HttpVersion, StatusLine};
use tether_client::{BodyReader, HttpMethod, Result, error};

/// The final response to a request.
pub struct Response {
    method: HttpMethod,
}

impl Response {
    pub(crate) fn new(method: HttpMethod) -> Self {
        Self { method }
    }

    /// Status code of the final response
    #[must_use]
    pub fn status(&self) -> u16 {
        self.method.status_code()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status())
    }

    #[must_use]
    pub fn status_line(&self) -> Option<&StatusLine> {
        self.method.status_line()
    }

    #[must_use]
    pub fn version(&self) -> HttpVersion {
        self.method.effective_version()
    }

    /// Value of the first header named `name`
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.method.response_header(name).map(|h| h.value())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderGroup {
        self.method.response_headers()
    }

    /// Trailer headers of a chunked body; empty until the body is read.
    #[must_use]
    pub fn trailers(&self) -> &HeaderGroup {
        self.method.response_trailer_headers()
    }

    /// Read the whole body
    pub fn bytes(mut self) -> Result<Bytes> {
        self.method.response_body()
    }

    /// Read the whole body as text in the charset named by `Content-Type`
    pub fn text(mut self) -> Result<String> {
        self.method.response_body_as_string()
    }

    /// Read the whole body and deserialize it as JSON
    pub fn json<T: DeserializeOwned>(mut self) -> Result<T> {
        let body = self.method.response_body()?;
        serde_json::from_slice(&body).map_err(error::decode)
    }

    /// Stream the body. The connection is released at end of body.
    #[must_use]
    pub fn into_reader(self) -> BodyReader<HttpMethod> {
        self.method.into_body_reader()
    }

    /// The executed engine method
    #[must_use]
    pub fn into_method(self) -> HttpMethod {
        self.method
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status())
            .field("headers", &self.headers().len())
            .finish()
    }
}
