use std::error::Error as StdError;
use std::io;

use super::helpers::{TlsHandshake, UnknownHost};
use super::types::{Error, Kind};
use crate::director::ProxyResponse;

impl Error {
    /// Returns true for transport failures, the only class the retry policy considers.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self.inner.kind, Kind::Io | Kind::NoResponse)
    }

    /// Returns true if the server dropped the connection without any response.
    #[must_use]
    pub fn is_no_response(&self) -> bool {
        matches!(self.inner.kind, Kind::NoResponse)
    }

    /// Returns true if the peer violated HTTP framing.
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(self.inner.kind, Kind::Protocol)
    }

    /// Returns true if the connection pool could not hand out a connection in time.
    ///
    /// Distinct from [`Error::is_timeout`], which reports socket timeouts.
    #[must_use]
    pub fn is_pool_timeout(&self) -> bool {
        matches!(self.inner.kind, Kind::PoolTimeout)
    }

    /// Returns true for any redirect failure.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(
            self.inner.kind,
            Kind::Redirect | Kind::CircularRedirect | Kind::MaxRedirects
        )
    }

    /// Returns true if the proxy refused to open a tunnel.
    #[must_use]
    pub fn is_tunnel_refused(&self) -> bool {
        matches!(self.inner.kind, Kind::TunnelRefused)
    }

    /// Returns true if the API was used in a state that does not allow the call.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self.inner.kind, Kind::Usage)
    }

    /// Returns true if a configuration or target could not be built.
    #[must_use]
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if a response body could not be decoded.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self.inner.kind, Kind::Decode)
    }

    /// Returns true if the error is related to a socket timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.io_error().is_some_and(|io| {
            matches!(io.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
        })
    }

    /// Returns true if DNS resolution failed.
    #[must_use]
    pub fn is_unknown_host(&self) -> bool {
        self.find_source::<UnknownHost>()
    }

    /// Returns true if the TLS handshake failed.
    #[must_use]
    pub fn is_tls_handshake(&self) -> bool {
        self.find_source::<TlsHandshake>()
    }

    /// Returns true if no route to the host exists.
    #[must_use]
    pub fn is_no_route(&self) -> bool {
        self.io_error().is_some_and(|io| {
            matches!(
                io.kind(),
                io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable
            )
        })
    }

    /// The underlying io error, if this is a transport failure.
    #[must_use]
    pub fn io_error(&self) -> Option<&io::Error> {
        self.inner
            .source
            .as_ref()
            .and_then(|source| source.downcast_ref::<io::Error>())
    }

    /// What the proxy answered when a CONNECT tunnel was refused.
    #[must_use]
    pub fn proxy_response(&self) -> Option<&ProxyResponse> {
        self.inner.proxy_response.as_ref()
    }

    fn find_source<T: StdError + 'static>(&self) -> bool {
        let mut source = self.source();

        while let Some(err) = source {
            if err.is::<T>() {
                return true;
            }
            if let Some(io) = err.downcast_ref::<io::Error>()
                && io.get_ref().is_some_and(|inner| inner.is::<T>())
            {
                return true;
            }
            source = err.source();
        }

        false
    }
}
