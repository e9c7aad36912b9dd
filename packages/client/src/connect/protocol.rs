//! Scheme registry and socket factories
//!
//! A `Protocol` binds a URL scheme to its default port, whether it is secure,
//! and the factory that opens sockets for it. `http` and `https` are
//! registered on first use; custom schemes can be added with
//! [`Protocol::register`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;
use std::net::{IpAddr, TcpStream};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use hashbrown::HashMap;

use super::tcp::{connect_to_address_list, establish_rustls_connection, resolve_host_sync};
use super::transport::Transport;
use crate::config::ConnectionParams;

/// Opens sockets for one protocol.
pub trait ProtocolSocketFactory: Send + Sync + fmt::Debug {
    /// Open a connected socket to `host:port`.
    fn create_socket(
        &self,
        host: &str,
        port: u16,
        local_address: Option<IpAddr>,
        params: &ConnectionParams,
    ) -> io::Result<Transport>;

    /// Layer this protocol over a socket already connected through a proxy tunnel.
    fn create_layered(&self, stream: TcpStream, host: &str, port: u16) -> io::Result<Transport>;
}

/// Plain TCP sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainSocketFactory;

impl ProtocolSocketFactory for PlainSocketFactory {
    fn create_socket(
        &self,
        host: &str,
        port: u16,
        local_address: Option<IpAddr>,
        params: &ConnectionParams,
    ) -> io::Result<Transport> {
        let addrs = resolve_host_sync(host, port)?;
        connect_to_address_list(&addrs, local_address, params).map(Transport::Plain)
    }

    fn create_layered(&self, stream: TcpStream, _host: &str, _port: u16) -> io::Result<Transport> {
        Ok(Transport::Plain(stream))
    }
}

/// TLS over TCP using rustls.
#[derive(Debug, Default, Clone, Copy)]
pub struct TlsSocketFactory;

impl ProtocolSocketFactory for TlsSocketFactory {
    fn create_socket(
        &self,
        host: &str,
        port: u16,
        local_address: Option<IpAddr>,
        params: &ConnectionParams,
    ) -> io::Result<Transport> {
        let stream = PlainSocketFactory
            .create_socket(host, port, local_address, params)?
            .into_plain()
            .map_err(|_| io::Error::other("plain factory returned a TLS transport"))?;
        self.create_layered(stream, host, port)
    }

    fn create_layered(&self, stream: TcpStream, host: &str, _port: u16) -> io::Result<Transport> {
        establish_rustls_connection(stream, host).map(|tls| Transport::Tls(Box::new(tls)))
    }
}

/// A URL scheme and how to connect for it.
#[derive(Clone)]
pub struct Protocol {
    scheme: String,
    default_port: u16,
    secure: bool,
    factory: Arc<dyn ProtocolSocketFactory>,
}

static REGISTRY: OnceLock<RwLock<HashMap<String, Protocol>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, Protocol>> {
    REGISTRY.get_or_init(|| {
        let mut protocols = HashMap::new();
        for protocol in [Protocol::http(), Protocol::https()] {
            protocols.insert(protocol.scheme.clone(), protocol);
        }
        RwLock::new(protocols)
    })
}

impl Protocol {
    pub fn new(
        scheme: impl Into<String>,
        default_port: u16,
        secure: bool,
        factory: Arc<dyn ProtocolSocketFactory>,
    ) -> Self {
        Self {
            scheme: scheme.into().to_ascii_lowercase(),
            default_port,
            secure,
            factory,
        }
    }

    #[must_use]
    pub fn http() -> Self {
        Self::new("http", 80, false, Arc::new(PlainSocketFactory))
    }

    #[must_use]
    pub fn https() -> Self {
        Self::new("https", 443, true, Arc::new(TlsSocketFactory))
    }

    /// Look up a registered protocol by scheme, ignoring case.
    #[must_use]
    pub fn get(scheme: &str) -> Option<Protocol> {
        registry()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scheme.to_ascii_lowercase())
            .cloned()
    }

    /// Register or replace the protocol for its scheme.
    pub fn register(protocol: Protocol) {
        tracing::debug!("registering protocol {}", protocol.scheme);
        registry()
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(protocol.scheme.clone(), protocol);
    }

    pub fn unregister(scheme: &str) -> Option<Protocol> {
        registry()
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&scheme.to_ascii_lowercase())
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn default_port(&self) -> u16 {
        self.default_port
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    #[must_use]
    pub fn socket_factory(&self) -> &Arc<dyn ProtocolSocketFactory> {
        &self.factory
    }

    /// `port` if given, the scheme's default otherwise.
    #[must_use]
    pub fn resolve_port(&self, port: Option<u16>) -> u16 {
        port.unwrap_or(self.default_port)
    }
}

impl PartialEq for Protocol {
    fn eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme
            && self.default_port == other.default_port
            && self.secure == other.secure
    }
}

impl Eq for Protocol {}

impl Hash for Protocol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scheme.hash(state);
        self.default_port.hash(state);
        self.secure.hash(state);
    }
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protocol")
            .field("scheme", &self.scheme)
            .field("default_port", &self.default_port)
            .field("secure", &self.secure)
            .finish()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.default_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_protocols_are_registered() {
        let https = Protocol::get("HTTPS").expect("https registered");
        assert!(https.is_secure());
        assert_eq!(https.default_port(), 443);
        assert_eq!(Protocol::get("http").map(|p| p.resolve_port(None)), Some(80));
    }

    #[test]
    fn custom_protocols_can_be_registered() {
        Protocol::register(Protocol::new("unit-test", 8181, false, Arc::new(PlainSocketFactory)));
        assert_eq!(Protocol::get("unit-test").map(|p| p.default_port()), Some(8181));
        assert!(Protocol::unregister("unit-test").is_some());
        assert!(Protocol::get("unit-test").is_none());
    }
}
