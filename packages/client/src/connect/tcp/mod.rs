//! TCP and TLS socket establishment
//!
//! Blocking helpers behind the protocol socket factories: name resolution,
//! socket option setup with `socket2`, and eager rustls handshakes.

pub mod basic_connection;
pub mod dns_resolution;
pub mod tls_connections;

pub use basic_connection::connect_to_address_list;
pub use dns_resolution::resolve_host_sync;
pub use tls_connections::{client_config, establish_rustls_connection};
