//! Writing a request onto a connection

use std::io::Write;

use super::core::{HttpMethod, MethodKind};
use crate::connect::HttpConnection;
use crate::cookie::CookieOrigin;
use crate::error::{self, Result};
use crate::http::{ChunkedWriter, Header, HttpVersion};
use crate::state::HttpState;

/// What happened while waiting for `100 Continue` before sending a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueOutcome {
    /// The server asked for the body.
    Proceed,
    /// The server stayed silent; the body is sent anyway.
    TimedOut,
    /// The server answered with a final status; the body is not sent.
    FinalResponse,
}

const GENERATED: [&str; 7] = [
    "Host",
    "User-Agent",
    "Cookie",
    "Proxy-Connection",
    "Content-Length",
    "Transfer-Encoding",
    "Content-Type",
];

impl HttpMethod {
    /// `NAME target VERSION` for this method on `conn`.
    pub(crate) fn request_line(&self, conn: &HttpConnection) -> String {
        let version = self.resolved.version();
        if self.kind == MethodKind::Connect {
            return format!("{} {}:{} {}", self.name, conn.host(), conn.port(), version);
        }

        let mut line = format!("{} ", self.name);
        if !conn.is_transparent()
            && let Some(protocol) = conn.protocol()
        {
            line.push_str(&protocol.scheme().to_ascii_lowercase());
            line.push_str("://");
            line.push_str(conn.host());
            if conn.port() != protocol.default_port() {
                line.push(':');
                line.push_str(&conn.port().to_string());
            }
            if !self.path.starts_with('/') {
                line.push('/');
            }
        }
        line.push_str(&self.path);
        if let Some(query) = &self.query {
            line.push('?');
            line.push_str(query);
        }
        line.push(' ');
        line.push_str(&version.to_string());
        line
    }

    fn has_request_content(&self) -> bool {
        self.entity
            .as_ref()
            .is_some_and(|entity| entity.content_length() != Some(0))
    }

    fn is_chunked_request(&self) -> bool {
        self.request_headers
            .first("Transfer-Encoding")
            .is_some_and(|h| h.value().to_ascii_lowercase().contains("chunked"))
    }

    fn add_host_header(&mut self, conn: &HttpConnection) {
        if self.request_headers.contains("Host") {
            return;
        }
        let host = if self.kind == MethodKind::Connect {
            format!("{}:{}", conn.host(), conn.port())
        } else {
            let mut host = match self.resolved.virtual_host.as_deref() {
                Some(virtual_host) => {
                    tracing::debug!("Using virtual host name: {}", virtual_host);
                    virtual_host.to_string()
                }
                None => conn.host().to_string(),
            };
            if conn
                .protocol()
                .is_some_and(|protocol| protocol.default_port() != conn.port())
            {
                host.push(':');
                host.push_str(&conn.port().to_string());
            }
            host
        };
        self.request_headers.add(Header::auto("Host", host));
    }

    fn add_cookie_headers(&mut self, state: &HttpState, conn: &HttpConnection) {
        let spec = self.resolved.cookie_policy().spec();
        let host = self
            .resolved
            .virtual_host
            .clone()
            .unwrap_or_else(|| conn.host().to_string());
        let origin = CookieOrigin::new(&host, conn.port(), &self.path, conn.is_secure());
        let cookies = state.matching_cookies(spec, &origin);
        if cookies.is_empty() {
            return;
        }
        if self.resolved.is_single_cookie_header() {
            let value = spec.format_cookies(&cookies);
            self.request_headers.add(Header::auto("Cookie", value));
        } else {
            for cookie in &cookies {
                let value = spec.format_cookie(cookie);
                self.request_headers.add(Header::auto("Cookie", value));
            }
        }
    }

    fn add_entity_headers(&mut self) -> Result<()> {
        let enclosing = self.is_entity_enclosing();
        if !enclosing && self.entity.is_none() {
            return Ok(());
        }
        if !self.request_headers.contains("Content-Length")
            && !self.request_headers.contains("Transfer-Encoding")
        {
            match self.entity.as_ref().map_or(Some(0), |e| e.content_length()) {
                Some(length) => self
                    .request_headers
                    .add(Header::auto("Content-Length", length.to_string())),
                None if self.resolved.version() >= HttpVersion::HTTP_1_1 => self
                    .request_headers
                    .add(Header::auto("Transfer-Encoding", "chunked")),
                None => {
                    return Err(error::protocol(format!(
                        "{} does not support chunk encoding",
                        self.resolved.version()
                    )));
                }
            }
        }
        if !self.request_headers.contains("Content-Type")
            && let Some(content_type) = self.entity.as_ref().and_then(|e| e.content_type())
        {
            let content_type = content_type.to_string();
            self.request_headers
                .add(Header::auto("Content-Type", content_type));
        }
        Ok(())
    }

    fn add_expect_header(&mut self) {
        let wanted = self.is_entity_enclosing()
            && self.resolved.is_expect_continue()
            && self.resolved.version() >= HttpVersion::HTTP_1_1
            && self.has_request_content();
        let present = self.request_headers.contains("Expect");
        if wanted && !present {
            self.request_headers
                .add(Header::auto("Expect", "100-continue"));
        } else if !wanted && present {
            self.request_headers.remove("Expect");
        }
    }

    /// Regenerate the headers the engine owns for this attempt.
    fn add_request_headers(&mut self, state: &HttpState, conn: &HttpConnection) -> Result<()> {
        for name in GENERATED {
            self.request_headers.remove_auto_generated(name);
        }

        if !self.request_headers.contains("User-Agent") {
            let agent = self.resolved.user_agent().to_string();
            self.request_headers.add(Header::auto("User-Agent", agent));
        }
        self.add_host_header(conn);
        if self.kind == MethodKind::Standard {
            self.add_cookie_headers(state, conn);
        }
        if !conn.is_transparent() && !self.request_headers.contains("Proxy-Connection") {
            self.request_headers
                .add(Header::auto("Proxy-Connection", "Keep-Alive"));
        }
        if self.kind == MethodKind::Standard {
            self.add_entity_headers()?;
            self.add_expect_header();
        }
        Ok(())
    }

    /// Write the request head, run the `100-continue` handshake if one was
    /// asked for, then write the body.
    pub(crate) fn write_request(&mut self, state: &HttpState, conn: &mut HttpConnection) -> Result<()> {
        self.add_request_headers(state, conn)?;

        let line = self.request_line(conn);
        conn.write_line(&line).map_err(error::io)?;
        for header in self.request_headers.iter() {
            conn.write_line(&header.to_string()).map_err(error::io)?;
        }
        conn.write_line("").map_err(error::io)?;

        let expects_continue = self
            .request_headers
            .first("Expect")
            .is_some_and(|h| h.value().eq_ignore_ascii_case("100-continue"));
        if expects_continue {
            if self.resolved.version() >= HttpVersion::HTTP_1_1 {
                match self.await_continue(state, conn)? {
                    ContinueOutcome::Proceed => tracing::debug!("OK to continue"),
                    ContinueOutcome::TimedOut => {
                        self.request_headers.remove("Expect");
                        tracing::info!("100 (continue) read timeout. Resume sending the request");
                    }
                    ContinueOutcome::FinalResponse => {
                        // The peer may still be waiting for the body we never send.
                        self.connection_close_forced = true;
                        return Ok(());
                    }
                }
            } else {
                self.request_headers.remove("Expect");
                tracing::info!("'Expect: 100-continue' handshake is only supported by HTTP/1.1 or higher");
            }
        }

        self.write_request_body(conn)?;
        conn.flush_request().map_err(error::io)
    }

    /// Flush the head and wait a bounded time for the server's verdict.
    pub(crate) fn await_continue(
        &mut self,
        state: &HttpState,
        conn: &mut HttpConnection,
    ) -> Result<ContinueOutcome> {
        conn.flush_request().map_err(error::io)?;
        let previous = conn.socket_timeout();
        conn.set_socket_timeout(Some(self.resolved.continue_timeout()))
            .map_err(error::io)?;

        let outcome = loop {
            match self.read_status_and_headers(state, conn) {
                Ok(()) => {
                    let status = self.status_code();
                    if status == 100 {
                        self.status_line = None;
                        break Ok(ContinueOutcome::Proceed);
                    }
                    if (101..200).contains(&status) {
                        tracing::info!("Discarding unexpected response: {}", status);
                        self.status_line = None;
                        continue;
                    }
                    break Ok(ContinueOutcome::FinalResponse);
                }
                Err(e) if e.is_timeout() => break Ok(ContinueOutcome::TimedOut),
                Err(e) => break Err(e),
            }
        };

        conn.set_socket_timeout(previous).map_err(error::io)?;
        outcome
    }

    fn write_request_body(&mut self, conn: &mut HttpConnection) -> Result<()> {
        let chunked = self.is_chunked_request();
        let Some(entity) = self.entity.as_mut() else {
            tracing::debug!("Request body has not been specified");
            return Ok(());
        };
        if !chunked && entity.content_length() == Some(0) {
            tracing::debug!("Request body is empty");
            return Ok(());
        }
        if self.repeat_count > 0 && !entity.is_repeatable() {
            return Err(error::protocol(
                "unbuffered entity enclosing request can not be repeated",
            ));
        }
        self.repeat_count += 1;

        if chunked || entity.content_length().is_none() {
            let mut out = ChunkedWriter::new(&mut *conn);
            entity.write_to(&mut out).map_err(error::io)?;
            out.finish().map_err(error::io)?;
        } else {
            entity.write_to(conn).map_err(error::io)?;
        }
        conn.flush().map_err(error::io)
    }
}
