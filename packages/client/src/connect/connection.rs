//! A single HTTP connection
//!
//! Wraps one socket to a host or proxy with buffered line/byte primitives,
//! stale detection, tunnel layering and an activity stamp the pool uses to
//! find abandoned connections.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use super::host::HostConfiguration;
use super::protocol::Protocol;
use super::transport::Transport;
use crate::config::ConnectionParams;
use crate::http::{self, HeaderGroup};

const OUTPUT_BUFFER: usize = 8 * 1024;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Milliseconds on a process-local monotonic clock.
pub(crate) fn now_millis() -> u64 {
    u64::try_from(EPOCH.get_or_init(Instant::now).elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection is not open")
}

/// One persistent connection, owned by whoever has it checked out.
#[derive(Debug)]
pub struct HttpConnection {
    id: u64,
    config: HostConfiguration,
    params: ConnectionParams,
    stream: Option<BufReader<Transport>>,
    output: Vec<u8>,
    tunnel_established: bool,
    socket_timeout: Option<Duration>,
    activity: Arc<AtomicU64>,
}

impl HttpConnection {
    /// A closed connection for `config`. Nothing touches the network until [`open`](Self::open).
    #[must_use]
    pub fn new(config: HostConfiguration, params: ConnectionParams) -> Self {
        let socket_timeout = params.socket_timeout;
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            config,
            params,
            stream: None,
            output: Vec::with_capacity(OUTPUT_BUFFER),
            tunnel_established: false,
            socket_timeout,
            activity: Arc::new(AtomicU64::new(now_millis())),
        }
    }

    /// An inert, never-opened stand-in left behind when a guard hands its connection back.
    pub(crate) fn detached() -> Self {
        Self {
            id: 0,
            config: HostConfiguration::default(),
            params: ConnectionParams::default(),
            stream: None,
            output: Vec::new(),
            tunnel_established: false,
            socket_timeout: None,
            activity: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn host_configuration(&self) -> &HostConfiguration {
        &self.config
    }

    #[must_use]
    pub fn host(&self) -> &str {
        self.config.host().unwrap_or_default()
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.config.port().unwrap_or_default()
    }

    #[must_use]
    pub fn protocol(&self) -> Option<&Protocol> {
        self.config.protocol()
    }

    #[must_use]
    pub fn proxy_host(&self) -> Option<&str> {
        self.config.proxy_host()
    }

    #[must_use]
    pub fn proxy_port(&self) -> Option<u16> {
        self.config.proxy_port()
    }

    #[must_use]
    pub fn is_proxied(&self) -> bool {
        self.config.is_proxied()
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.config.is_secure()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// True once a CONNECT tunnel carries this connection end to end.
    #[must_use]
    pub fn is_tunnel_established(&self) -> bool {
        self.tunnel_established
    }

    /// True if requests go straight to the origin: no proxy, or a tunnel through one.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        !self.is_proxied() || self.tunnel_established
    }

    #[must_use]
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Connect the socket if it is not already open.
    ///
    /// A secure target behind a proxy opens a plain socket to the proxy; TLS
    /// is layered on later by [`tunnel_created`](Self::tunnel_created).
    pub fn open(&mut self) -> io::Result<()> {
        if self.is_open() {
            return Ok(());
        }
        let protocol = self
            .config
            .protocol()
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no target host configured"))?;

        let (host, port) = match self.config.proxy() {
            Some(proxy) => (proxy.name().to_string(), proxy.port()),
            None => (self.host().to_string(), self.port()),
        };
        let factory = if protocol.is_secure() && self.is_proxied() {
            Protocol::http().socket_factory().clone()
        } else {
            protocol.socket_factory().clone()
        };

        tracing::debug!("Open connection {} to {}:{}", self.id, host, port);
        let transport =
            factory.create_socket(&host, port, self.config.local_address(), &self.params)?;
        transport.set_read_timeout(self.socket_timeout)?;
        self.stream = Some(BufReader::new(transport));
        self.output.clear();
        self.tunnel_established = false;
        self.touch();
        Ok(())
    }

    /// Layer the target protocol over a socket once the proxy accepted CONNECT.
    pub fn tunnel_created(&mut self) -> io::Result<()> {
        if !self.is_secure() || !self.is_proxied() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "connection must be secure and proxied to use a tunnel",
            ));
        }
        if self.tunnel_established {
            return Err(io::Error::other("tunnel already established"));
        }
        let reader = self.stream.take().ok_or_else(not_open)?;
        if !reader.buffer().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "proxy sent data after accepting CONNECT",
            ));
        }
        let tcp = reader
            .into_inner()
            .into_plain()
            .map_err(|_| io::Error::other("tunnel requires a plain proxy socket"))?;

        let protocol = self
            .config
            .protocol()
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no target host configured"))?;
        let host = self.host().to_string();
        let transport = protocol
            .socket_factory()
            .create_layered(tcp, &host, self.port())?;
        transport.set_read_timeout(self.socket_timeout)?;
        self.stream = Some(BufReader::new(transport));
        self.tunnel_established = true;
        tracing::debug!("Tunnel to {}:{} established on connection {}", host, self.port(), self.id);
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(reader) = self.stream.take() {
            tracing::debug!("Close connection {} to {}", self.id, self.config);
            reader.into_inner().shutdown();
        }
        self.output.clear();
        self.tunnel_established = false;
    }

    /// Probe whether the peer silently closed an idle connection.
    ///
    /// Buffered input means the peer is alive. Otherwise a non-blocking
    /// peek distinguishes a closed socket (stale) from a quiet one.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        let Some(reader) = self.stream.as_ref() else {
            return true;
        };
        if !reader.buffer().is_empty() {
            return false;
        }
        !matches!(reader.get_ref().peek_nonblocking(), Ok(Some(true) | None))
    }

    /// Close the connection if it is open but stale. Returns true if it was closed.
    pub fn close_if_stale(&mut self) -> bool {
        if self.is_open() && self.is_stale() {
            tracing::debug!("Connection {} is stale, closing", self.id);
            self.close();
            return true;
        }
        false
    }

    /// Unread input is waiting, either buffered or on the socket.
    #[must_use]
    pub fn has_pending_input(&self) -> bool {
        let Some(reader) = self.stream.as_ref() else {
            return false;
        };
        !reader.buffer().is_empty() || matches!(reader.get_ref().peek_nonblocking(), Ok(Some(true)))
    }

    /// Wait up to the socket timeout for response bytes to arrive.
    pub fn is_response_available(&mut self) -> io::Result<bool> {
        let reader = self.stream.as_mut().ok_or_else(not_open)?;
        if !reader.buffer().is_empty() {
            return Ok(true);
        }
        match reader.fill_buf() {
            Ok(buf) => Ok(!buf.is_empty()),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Wait up to `timeout` for response bytes, restoring the socket timeout afterwards.
    pub fn is_response_available_within(&mut self, timeout: Duration) -> io::Result<bool> {
        let previous = self.socket_timeout;
        self.set_socket_timeout(Some(timeout))?;
        let available = self.is_response_available();
        self.set_socket_timeout(previous)?;
        available
    }

    /// Apply a read timeout; `None` blocks indefinitely.
    pub fn set_socket_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        let timeout = timeout.filter(|t| !t.is_zero());
        self.socket_timeout = timeout;
        if let Some(reader) = self.stream.as_ref() {
            reader.get_ref().set_read_timeout(timeout)?;
            reader.get_ref().set_write_timeout(timeout)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn socket_timeout(&self) -> Option<Duration> {
        self.socket_timeout
    }

    /// Read one head line; `None` at end of input.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        self.touch();
        http::read_line(self.reader()?)
    }

    pub fn read_headers(&mut self) -> io::Result<HeaderGroup> {
        self.touch();
        http::parse_headers(self.reader()?)
    }

    /// Buffered input side of the socket, for body decoders.
    pub fn reader(&mut self) -> io::Result<&mut BufReader<Transport>> {
        self.activity.store(now_millis(), Ordering::Relaxed);
        self.stream.as_mut().ok_or_else(not_open)
    }

    /// Queue a line followed by CRLF.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        tracing::trace!(target: http::parser::WIRE, ">> {line:?}");
        self.write_all(line.as_bytes())?;
        self.write_all(b"\r\n")
    }

    /// Send everything queued so far.
    pub fn flush_request(&mut self) -> io::Result<()> {
        self.flush()
    }

    /// A handle that can shut the socket down from another thread.
    pub fn shutdown_handle(&self) -> io::Result<TcpStream> {
        self.stream
            .as_ref()
            .ok_or_else(not_open)?
            .get_ref()
            .shutdown_handle()
    }

    /// Record activity now.
    pub fn touch(&self) {
        self.activity.store(now_millis(), Ordering::Relaxed);
    }

    /// Shared last-activity stamp, in [`now_millis`] units.
    pub(crate) fn activity(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.activity)
    }

    /// Time since the last read or write.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        Duration::from_millis(now_millis().saturating_sub(self.activity.load(Ordering::Relaxed)))
    }

    fn drain_output(&mut self) -> io::Result<()> {
        if self.output.is_empty() {
            return Ok(());
        }
        let reader = self.stream.as_mut().ok_or_else(not_open)?;
        let result = reader.get_mut().write_all(&self.output);
        self.output.clear();
        result
    }
}

impl Write for HttpConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.stream.is_none() {
            return Err(not_open());
        }
        self.touch();
        self.output.extend_from_slice(buf);
        if self.output.len() >= OUTPUT_BUFFER {
            self.drain_output()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.touch();
        self.drain_output()?;
        self.stream.as_mut().ok_or_else(not_open)?.get_mut().flush()
    }
}

impl Drop for HttpConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write as _};
    use std::net::TcpListener;

    use url::Url;

    use super::*;

    fn local_pair() -> (HttpConnection, std::net::TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).expect("url");
        let config = HostConfiguration::for_url(&url).expect("config");
        let mut conn = HttpConnection::new(config, ConnectionParams::default());
        conn.open().expect("open");
        let (server, _) = listener.accept().expect("accept");
        (conn, server)
    }

    #[test]
    fn writes_are_buffered_until_flush() {
        let (mut conn, mut server) = local_pair();
        conn.write_line("GET / HTTP/1.1").expect("queue");
        conn.flush_request().expect("flush");

        let mut received = [0u8; 16];
        server.read_exact(&mut received).expect("read");
        assert_eq!(&received, b"GET / HTTP/1.1\r\n");
    }

    #[test]
    fn closed_peer_makes_connection_stale() {
        let (mut conn, server) = local_pair();
        assert!(!conn.is_stale());
        drop(server);
        std::thread::sleep(Duration::from_millis(50));
        assert!(conn.close_if_stale());
        assert!(!conn.is_open());
    }

    #[test]
    fn pending_input_is_detected() {
        let (mut conn, mut server) = local_pair();
        server.write_all(b"HTTP/1.1 200 OK\r\n").expect("write");
        assert!(conn.is_response_available_within(Duration::from_millis(500)).expect("probe"));
        assert!(conn.has_pending_input());
        assert_eq!(conn.read_line().expect("line").as_deref(), Some("HTTP/1.1 200 OK"));
        assert!(conn.is_transparent());
    }
}
