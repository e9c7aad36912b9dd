//! Connections and connection targets
//!
//! `HostConfiguration` says where a connection goes, `Protocol` how to open
//! sockets for a scheme, and `HttpConnection` owns one open socket.

pub mod connection;
pub mod host;
pub mod protocol;
pub mod tcp;
pub mod transport;

pub use connection::HttpConnection;
pub use host::{HostConfiguration, HttpHost, ProxyHost};
pub use protocol::{PlainSocketFactory, Protocol, ProtocolSocketFactory, TlsSocketFactory};
pub use transport::Transport;
