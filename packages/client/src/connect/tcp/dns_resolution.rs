//! Blocking name resolution

use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::error::helpers::unknown_host_io;

/// Resolve a host name to socket addresses.
///
/// IP literals (including bracketed IPv6) skip the resolver. A failed or
/// empty lookup is reported as an unknown host.
pub fn resolve_host_sync(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }

    match (bare, port).to_socket_addrs() {
        Ok(addrs) => {
            let addrs: Vec<SocketAddr> = addrs.collect();
            if addrs.is_empty() {
                Err(unknown_host_io(host))
            } else {
                Ok(addrs)
            }
        }
        Err(e) => {
            tracing::debug!("DNS resolution failed for {}: {}", host, e);
            Err(unknown_host_io(host))
        }
    }
}
