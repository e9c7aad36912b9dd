//! Socket creation with connect timeout, local binding and buffer tuning

use std::io;
use std::net::{IpAddr, SocketAddr, TcpStream};

use socket2::{Domain, Protocol, Socket, Type};

use crate::config::ConnectionParams;

/// Connect to the first reachable address in the list.
///
/// Every address is tried in order; the error from the last attempt is
/// returned if none accepts. When `local_address` is set, only addresses of
/// the same family are tried and the socket is bound before connecting.
pub fn connect_to_address_list(
    addrs: &[SocketAddr],
    local_address: Option<IpAddr>,
    params: &ConnectionParams,
) -> io::Result<TcpStream> {
    let mut last_error = None;

    for addr in addrs {
        if let Some(local) = local_address
            && local.is_ipv4() != addr.is_ipv4()
        {
            continue;
        }
        match connect_one(*addr, local_address, params) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("Failed to connect to {}: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, "no usable address to connect to")
    }))
}

fn connect_one(
    addr: SocketAddr,
    local_address: Option<IpAddr>,
    params: &ConnectionParams,
) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

    if let Some(local) = local_address {
        socket.bind(&SocketAddr::new(local, 0).into())?;
    }
    if let Some(size) = params.send_buffer_size {
        socket.set_send_buffer_size(size)?;
    }
    if let Some(size) = params.receive_buffer_size {
        socket.set_recv_buffer_size(size)?;
    }
    if params.linger.is_some() {
        socket.set_linger(params.linger)?;
    }

    match params.connection_timeout {
        Some(timeout) => socket.connect_timeout(&addr.into(), timeout)?,
        None => socket.connect(&addr.into())?,
    }

    let stream: TcpStream = socket.into();
    stream.set_nodelay(params.tcp_nodelay)?;
    stream.set_read_timeout(params.socket_timeout)?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn connects_to_first_accepting_address() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let stream = connect_to_address_list(&[addr], None, &ConnectionParams::default())
            .expect("connects");
        assert!(stream.nodelay().expect("nodelay readable"));
    }

    #[test]
    fn empty_list_is_an_error() {
        assert!(connect_to_address_list(&[], None, &ConnectionParams::default()).is_err());
    }
}
