//! What a proxy said when it refused a tunnel

use std::fmt;

use bytes::Bytes;

use crate::http::{Header, HeaderGroup, StatusLine};

/// The response a proxy gave to a CONNECT request it did not accept.
#[derive(Clone)]
pub struct ProxyResponse {
    status_line: StatusLine,
    headers: HeaderGroup,
    body: Bytes,
}

impl ProxyResponse {
    pub(crate) fn new(status_line: StatusLine, headers: HeaderGroup, body: Bytes) -> Self {
        Self {
            status_line,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn status_line(&self) -> &StatusLine {
        &self.status_line
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_line.status_code()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderGroup {
        &self.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Header> {
        self.headers.first(name)
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl fmt::Debug for ProxyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyResponse")
            .field("status_line", &self.status_line.to_string())
            .field("headers", &self.headers.len())
            .field("body", &self.body.len())
            .finish()
    }
}

/// Outcome of the CONNECT exchange.
#[derive(Debug)]
pub(crate) enum TunnelResult {
    Established,
    Failed(ProxyResponse),
}
