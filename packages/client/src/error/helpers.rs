//! Marker errors carried as sources inside `Error`
//!
//! Retry decisions look through an error's source chain for these markers,
//! so each transport failure class that changes retry behaviour gets its own type.

use std::io;

/// DNS resolution produced no address for the host.
#[derive(Debug, thiserror::Error)]
#[error("unknown host: {host}")]
pub struct UnknownHost {
    pub host: String,
}

/// The TLS handshake with the peer failed.
#[derive(Debug, thiserror::Error)]
#[error("TLS handshake with {host} failed: {reason}")]
pub struct TlsHandshake {
    pub host: String,
    pub reason: String,
}

/// The connection manager has been shut down.
#[derive(Debug, thiserror::Error)]
#[error("connection manager has been shut down")]
pub struct ConnectionShutdown;

/// Wrap an unknown-host marker into an `io::Error` so it travels through `Read`/`Write` APIs.
pub(crate) fn unknown_host_io(host: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        UnknownHost {
            host: host.to_string(),
        },
    )
}

/// Wrap a TLS failure into an `io::Error`.
pub(crate) fn tls_handshake_io(host: &str, reason: impl ToString) -> io::Error {
    io::Error::new(
        io::ErrorKind::ConnectionAborted,
        TlsHandshake {
            host: host.to_string(),
            reason: reason.to_string(),
        },
    )
}

/// Returns true if the io error carries the given marker type.
#[cfg(test)]
pub(crate) fn io_carries<T: std::error::Error + 'static>(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<T>())
}
