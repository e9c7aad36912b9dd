use std::error::Error as StdError;
use std::fmt;

use crate::director::ProxyResponse;

/// A Result alias where the Err case is `tether_client::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur while executing HTTP methods.
pub struct Error {
    pub inner: Box<Inner>,
}

pub struct Inner {
    pub kind: Kind,
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub url: Option<url::Url>,
    pub proxy_response: Option<ProxyResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Transport failure: refused, reset, timed out, dropped.
    Io,
    /// The server closed the connection without sending a status line.
    NoResponse,
    /// The peer violated HTTP/1.x framing rules.
    Protocol,
    /// No pooled connection became available within the acquire timeout.
    PoolTimeout,
    /// A redirect could not be followed.
    Redirect,
    /// A redirect pointed back at an already visited location.
    CircularRedirect,
    /// The redirect budget was used up.
    MaxRedirects,
    /// The proxy answered CONNECT with a non-2xx status.
    TunnelRefused,
    /// The API was used in an illegal state.
    Usage,
    /// Invalid configuration or request construction.
    Builder,
    /// A response body could not be turned into the requested type.
    Decode,
}

impl Error {
    pub fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                source: None,
                url: None,
                proxy_response: None,
            }),
        }
    }

    #[must_use = "Error builder methods return a new Error and should be used"]
    pub fn with<E: Into<Box<dyn StdError + Send + Sync>>>(mut self, source: E) -> Error {
        self.inner.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: url::Url) -> Self {
        self.inner.url = Some(url);
        self
    }

    #[must_use]
    pub(crate) fn with_proxy_response(mut self, response: ProxyResponse) -> Self {
        self.inner.proxy_response = Some(response);
        self
    }

    /// The classification of this error.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// Get the URL associated with this error, if any
    #[must_use]
    pub fn url(&self) -> Option<&url::Url> {
        self.inner.url.as_ref()
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("tether_client::Error");

        f.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }

        if let Some(ref url) = self.inner.url {
            f.field("url", url);
        }

        if let Some(ref response) = self.inner.proxy_response {
            f.field("proxy_status", &response.status_line().status_code());
        }

        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::Io => f.write_str("i/o error")?,
            Kind::NoResponse => f.write_str("server failed to respond")?,
            Kind::Protocol => f.write_str("protocol violation")?,
            Kind::PoolTimeout => f.write_str("timeout waiting for pooled connection")?,
            Kind::Redirect => f.write_str("error following redirect")?,
            Kind::CircularRedirect => f.write_str("circular redirect")?,
            Kind::MaxRedirects => f.write_str("maximum redirects exceeded")?,
            Kind::TunnelRefused => f.write_str("proxy refused tunnel")?,
            Kind::Usage => f.write_str("illegal state")?,
            Kind::Builder => f.write_str("builder error")?,
            Kind::Decode => f.write_str("error decoding response body")?,
        }

        if let Some(ref source) = self.inner.source {
            write!(f, ": {source}")?;
        }

        if let Some(ref url) = self.inner.url {
            write!(f, " ({url})")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}
