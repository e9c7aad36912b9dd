//! rustls client sessions

use std::io;
use std::net::TcpStream;
use std::sync::{Arc, OnceLock};

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use crate::error::helpers::tls_handshake_io;

static CLIENT_CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();

/// The shared client configuration, trusting the webpki root set.
pub fn client_config() -> io::Result<Arc<ClientConfig>> {
    if let Some(config) = CLIENT_CONFIG.get() {
        return Ok(Arc::clone(config));
    }

    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| io::Error::other(format!("TLS configuration error: {e}")))?
    .with_root_certificates(root_store)
    .with_no_client_auth();

    Ok(Arc::clone(CLIENT_CONFIG.get_or_init(|| Arc::new(config))))
}

/// Run a TLS handshake over an established TCP stream.
///
/// The handshake completes before returning, so certificate and protocol
/// failures surface here, tagged as handshake failures, rather than on the
/// first request write.
pub fn establish_rustls_connection(
    stream: TcpStream,
    host: &str,
) -> io::Result<StreamOwned<ClientConnection, TcpStream>> {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    let server_name = ServerName::try_from(bare.to_string())
        .map_err(|e| tls_handshake_io(host, format!("invalid server name: {e}")))?;

    let client = ClientConnection::new(client_config()?, server_name)
        .map_err(|e| tls_handshake_io(host, e))?;

    let mut tls = StreamOwned::new(client, stream);
    while tls.conn.is_handshaking() {
        tls.conn
            .complete_io(&mut tls.sock)
            .map_err(|e| tls_handshake_io(host, e))?;
    }
    tracing::debug!(
        "TLS session with {} established ({:?})",
        host,
        tls.conn.protocol_version()
    );
    Ok(tls)
}
