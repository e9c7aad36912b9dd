//! Scripted HTTP/1.x server for integration tests
//!
//! Each accepted connection gets its own thread. Requests are parsed just
//! far enough to find their end; a handler decides what bytes go back.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Install a fmt subscriber honoring `RUST_LOG`; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Zero-based index of the accepted connection that carried it
    pub connection: usize,
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn header_count(&self, name: &str) -> usize {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .count()
    }

    pub fn method(&self) -> &str {
        self.request_line.split(' ').next().unwrap_or("")
    }

    pub fn target(&self) -> &str {
        self.request_line.split(' ').nth(1).unwrap_or("")
    }
}

/// What the server does after reading a request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Write the bytes and wait for the next request on the connection
    Send(Vec<u8>),
    /// Write the bytes and close the connection
    SendAndClose(Vec<u8>),
    /// Close without writing anything
    Drop,
    /// Say nothing for a while, then close
    Stall(Duration),
}

impl Reply {
    pub fn send(bytes: impl AsRef<[u8]>) -> Self {
        Reply::Send(bytes.as_ref().to_vec())
    }

    pub fn close(bytes: impl AsRef<[u8]>) -> Self {
        Reply::SendAndClose(bytes.as_ref().to_vec())
    }

    /// `200 OK` with a text body and `Content-Length`.
    pub fn ok(body: &str) -> Self {
        Reply::send(format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ))
    }
}

/// How the server answers `Expect: 100-continue`.
#[derive(Debug, Clone)]
pub enum ExpectMode {
    /// Send `100 Continue`, then read the body
    Continue,
    /// Send nothing until the body arrives
    Silent,
    /// Send this final response instead of reading the body, then close
    Reject(Vec<u8>),
}

type Handler = dyn Fn(usize, &RecordedRequest) -> Reply + Send + Sync;

#[derive(Clone)]
struct Shared {
    handler: Arc<Handler>,
    expect: ExpectMode,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    request_count: Arc<AtomicUsize>,
    connection_count: Arc<AtomicUsize>,
}

/// A listener on an ephemeral loopback port.
pub struct ScriptedServer {
    addr: SocketAddr,
    shared: Shared,
}

impl ScriptedServer {
    /// Start a server; `handler` receives the zero-based request index.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(usize, &RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        Self::start_with(ExpectMode::Continue, handler)
    }

    pub fn start_with<F>(expect: ExpectMode, handler: F) -> Self
    where
        F: Fn(usize, &RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let shared = Shared {
            handler: Arc::new(handler),
            expect,
            requests: Arc::new(Mutex::new(Vec::new())),
            request_count: Arc::new(AtomicUsize::new(0)),
            connection_count: Arc::new(AtomicUsize::new(0)),
        };

        let accept_shared = shared.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let connection = accept_shared.connection_count.fetch_add(1, Ordering::SeqCst);
                let shared = accept_shared.clone();
                thread::spawn(move || serve(stream, connection, &shared));
            }
        });

        Self { addr, shared }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.addr.port(), path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.shared.request_count.load(Ordering::SeqCst)
    }

    pub fn connection_count(&self) -> usize {
        self.shared.connection_count.load(Ordering::SeqCst)
    }
}

fn serve(stream: TcpStream, connection: usize, shared: &Shared) {
    let Ok(mut writer) = stream.try_clone() else { return };
    let mut reader = BufReader::new(stream);
    loop {
        let Some((request_line, headers)) = read_head(&mut reader) else {
            return;
        };
        let mut request = RecordedRequest {
            connection,
            request_line,
            headers,
            body: Vec::new(),
        };

        if request
            .header("Expect")
            .is_some_and(|v| v.eq_ignore_ascii_case("100-continue"))
        {
            match &shared.expect {
                ExpectMode::Continue => {
                    if writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").is_err() {
                        return;
                    }
                }
                ExpectMode::Silent => {}
                ExpectMode::Reject(bytes) => {
                    record(shared, request);
                    let _ = writer.write_all(bytes);
                    return;
                }
            }
        }

        match read_body(&mut reader, &request) {
            Some(body) => request.body = body,
            None => return,
        }

        let index = record(shared, request.clone());
        match (shared.handler)(index, &request) {
            Reply::Send(bytes) => {
                if writer.write_all(&bytes).and_then(|()| writer.flush()).is_err() {
                    return;
                }
            }
            Reply::SendAndClose(bytes) => {
                let _ = writer.write_all(&bytes);
                let _ = writer.flush();
                return;
            }
            Reply::Drop => return,
            Reply::Stall(pause) => {
                thread::sleep(pause);
                return;
            }
        }
    }
}

fn record(shared: &Shared, request: RecordedRequest) -> usize {
    let index = shared.request_count.fetch_add(1, Ordering::SeqCst);
    shared
        .requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(request);
    index
}

fn read_head(reader: &mut BufReader<TcpStream>) -> Option<(String, Vec<(String, String)>)> {
    let mut line = String::new();
    if reader.read_line(&mut line).ok()? == 0 {
        return None;
    }
    let request_line = line.trim_end().to_string();
    let mut headers = Vec::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    Some((request_line, headers))
}

fn read_body(reader: &mut BufReader<TcpStream>, request: &RecordedRequest) -> Option<Vec<u8>> {
    if request
        .header("Transfer-Encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"))
    {
        return read_chunked(reader);
    }
    let length = request
        .header("Content-Length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).ok()?;
    Some(body)
}

fn read_chunked(reader: &mut BufReader<TcpStream>) -> Option<Vec<u8>> {
    let mut body = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        reader.read_line(&mut line).ok()?;
        let size_text = line.trim_end().split(';').next().unwrap_or("");
        let size = usize::from_str_radix(size_text.trim(), 16).ok()?;
        if size == 0 {
            loop {
                line.clear();
                if reader.read_line(&mut line).ok()? == 0 || line.trim_end().is_empty() {
                    return Some(body);
                }
            }
        }
        let start = body.len();
        body.resize(start + size, 0);
        reader.read_exact(&mut body[start..]).ok()?;
        line.clear();
        reader.read_line(&mut line).ok()?;
    }
}
