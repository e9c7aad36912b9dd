use std::io;

use super::types::{Error, Kind};
use crate::director::ProxyResponse;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Creates an `Error` for a transport failure.
pub fn io(e: io::Error) -> Error {
    Error::new(Kind::Io).with(e)
}

/// Creates an `Error` for a server that dropped the connection before responding.
pub fn no_response(host: &str) -> Error {
    Error::new(Kind::NoResponse).with(format!("the server {host} failed to respond"))
}

/// Creates an `Error` for a framing or parse violation.
pub fn protocol<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Protocol).with(e.into())
}

/// Classify an io error raised while reading or writing HTTP framing.
/// `InvalidData` marks a framing violation, everything else is transport.
pub(crate) fn wire(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::InvalidData {
        protocol(e)
    } else {
        io(e)
    }
}

/// Creates an `Error` for pool exhaustion.
pub fn pool_timeout() -> Error {
    Error::new(Kind::PoolTimeout).with("timeout waiting for connection")
}

/// Creates an `Error` for a redirect that cannot be followed.
pub fn redirect<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Redirect).with(e.into())
}

/// Creates an `Error` naming the location that closed a redirect loop.
pub fn circular_redirect(url: url::Url) -> Error {
    Error::new(Kind::CircularRedirect)
        .with(format!("circular redirect to '{url}'"))
        .with_url(url)
}

/// Creates an `Error` for an exhausted redirect budget.
pub fn max_redirects(max: u32) -> Error {
    Error::new(Kind::MaxRedirects).with(format!("maximum redirects ({max}) exceeded"))
}

/// Creates an `Error` for a refused CONNECT, keeping what the proxy said.
pub fn tunnel_refused(response: ProxyResponse) -> Error {
    let line = response.status_line().to_string();
    Error::new(Kind::TunnelRefused)
        .with(format!("CONNECT refused by proxy: {line}"))
        .with_proxy_response(response)
}

/// Creates an `Error` for API misuse.
pub fn usage<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Usage).with(e.into())
}

/// Creates an `Error` for a builder or configuration error.
pub fn builder<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Builder).with(e.into())
}

/// Creates an `Error` for a response body that could not be decoded.
pub fn decode<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Decode).with(e.into())
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        io(e)
    }
}

impl From<crate::config::ConfigurationError> for Error {
    fn from(e: crate::config::ConfigurationError) -> Self {
        builder(e)
    }
}
