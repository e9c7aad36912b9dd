//! Reading a response off a connection
//!
//! The head is read eagerly. The body stays on the connection behind a
//! [`BodyDecoder`] until the caller reads, buffers or releases it; once the
//! decoder reports the end of the body the connection is either kept for
//! reuse or closed.

use bytes::Bytes;

use super::core::{HttpMethod, MethodKind, ResponseBody};
use super::keep_alive::should_close_connection;
use crate::connect::HttpConnection;
use crate::cookie::CookieOrigin;
use crate::error::{self, Result};
use crate::http::{BodyDecoder, ChunkedDecoder, HeaderGroup, HttpVersion, LengthDecoder, StatusLine};
use crate::state::HttpState;

const SET_COOKIE_HEADERS: [&str; 2] = ["Set-Cookie", "Set-Cookie2"];

/// The last parseable `Content-Length`, if any.
pub(crate) fn declared_content_length(headers: &HeaderGroup) -> Option<u64> {
    let values: Vec<_> = headers.all("Content-Length").collect();
    if values.len() > 1 {
        tracing::warn!("Multiple content-length headers detected");
    }
    values.iter().rev().find_map(|header| {
        let parsed = header.value().trim().parse::<u64>().ok();
        if parsed.is_none() {
            tracing::warn!("Invalid content-length value: {}", header.value());
        }
        parsed
    })
}

impl HttpMethod {
    /// Statuses that never carry a body, whatever the headers claim.
    fn can_response_have_body(&self, status: u16) -> bool {
        if (100..200).contains(&status) || status == 204 || status == 304 {
            return false;
        }
        if self.name == http::Method::HEAD {
            return false;
        }
        !(self.kind == MethodKind::Connect && (200..300).contains(&status))
    }

    /// Read lines until one looks like a status line.
    fn read_status_line(&mut self, conn: &mut HttpConnection) -> Result<()> {
        let limit = self.resolved.status_line_garbage_limit();
        let mut count = 0usize;
        let line = loop {
            let line = conn.read_line().map_err(error::wire)?;
            match line {
                None if count == 0 => return Err(error::no_response(conn.host())),
                Some(line) if StatusLine::starts_with_http(&line) => break line,
                None => {
                    return Err(error::protocol(format!(
                        "the server {} failed to respond with a valid HTTP response",
                        conn.host()
                    )));
                }
                Some(_) if count >= limit => {
                    return Err(error::protocol(format!(
                        "the server {} failed to respond with a valid HTTP response",
                        conn.host()
                    )));
                }
                Some(_) => count += 1,
            }
        };

        let status_line = StatusLine::parse(&line, self.resolved.is_unambiguous_status_line())
            .map_err(error::wire)?;
        self.effective_version = Some(status_line.version());
        self.status_line = Some(status_line);
        Ok(())
    }

    /// Read one status line and header block, storing any cookies it sets.
    pub(crate) fn read_status_and_headers(
        &mut self,
        state: &HttpState,
        conn: &mut HttpConnection,
    ) -> Result<()> {
        self.read_status_line(conn)?;
        self.response_headers = conn.read_headers().map_err(error::wire)?;
        self.process_cookies(state, conn);
        Ok(())
    }

    fn process_cookies(&self, state: &HttpState, conn: &HttpConnection) {
        let spec = self.resolved.cookie_policy().spec();
        let host = self
            .resolved
            .virtual_host
            .as_deref()
            .unwrap_or_else(|| conn.host());
        let origin = CookieOrigin::new(host, conn.port(), &self.path, conn.is_secure());

        for name in SET_COOKIE_HEADERS {
            for header in self.response_headers.all(name) {
                let cookies = match spec.parse(&origin, header.value()) {
                    Ok(cookies) => cookies,
                    Err(e) => {
                        tracing::warn!("Invalid cookie header: \"{}\". {}", header.value(), e);
                        continue;
                    }
                };
                for cookie in cookies {
                    match spec.validate(&origin, &cookie) {
                        Ok(()) => {
                            tracing::debug!("Cookie accepted: \"{}\"", spec.format_cookie(&cookie));
                            state.add_cookie(cookie);
                        }
                        Err(e) => {
                            tracing::warn!("Cookie rejected: \"{}\". {}", spec.format_cookie(&cookie), e);
                        }
                    }
                }
            }
        }
    }

    /// Pick the framing of the response body.
    fn body_decoder(&mut self, conn: &mut HttpConnection) -> Result<BodyDecoder> {
        let status = self.status_code();
        if !self.can_response_have_body(status) {
            return Ok(BodyDecoder::Empty);
        }
        let strict = self.resolved.is_strict_transfer_encoding();

        if let Some(header) = self.response_headers.condensed("Transfer-Encoding") {
            let encodings = header.elements();
            let value = header.value();
            if !value.eq_ignore_ascii_case("chunked") && !value.eq_ignore_ascii_case("identity") {
                tracing::warn!("Unsupported transfer encoding: {}", value);
            }
            if encodings
                .last()
                .is_some_and(|e| e.name.eq_ignore_ascii_case("chunked"))
            {
                if conn.is_response_available().map_err(error::io)? {
                    return Ok(BodyDecoder::Chunked(ChunkedDecoder::new()));
                }
                if strict {
                    return Err(error::protocol("chunk-encoded body declared but not sent"));
                }
                tracing::warn!("Chunk-encoded body missing");
                return Ok(BodyDecoder::Empty);
            }
            if strict && !value.eq_ignore_ascii_case("identity") {
                return Err(error::protocol(format!("unsupported transfer encoding: {value}")));
            }
            tracing::info!("Response content is not chunk-encoded");
            self.connection_close_forced = true;
            return Ok(BodyDecoder::UntilClose { done: false });
        }

        if let Some(length) = declared_content_length(&self.response_headers) {
            return Ok(BodyDecoder::Length(LengthDecoder::new(length)));
        }

        if self.effective_version() >= HttpVersion::HTTP_1_1 {
            let close_requested = self
                .response_headers
                .first("Connection")
                .is_some_and(|h| h.value().eq_ignore_ascii_case("close"));
            if !close_requested {
                tracing::info!("Response content length is not known");
                self.connection_close_forced = true;
            }
        }
        Ok(BodyDecoder::UntilClose { done: false })
    }

    /// Read the final response head, skipping provisional `1xx` responses,
    /// and set up the body.
    pub(crate) fn read_response(&mut self, state: &HttpState, conn: &mut HttpConnection) -> Result<()> {
        while self.status_line.is_none() {
            self.read_status_and_headers(state, conn)?;
            let status = self.status_code();
            if (100..200).contains(&status) {
                tracing::info!("Discarding unexpected response: {}", status);
                self.status_line = None;
            }
        }

        let decoder = self.body_decoder(conn)?;
        if decoder.is_complete() {
            self.body = ResponseBody::None;
            self.finish_response(conn);
        } else {
            self.body = ResponseBody::Pending(decoder);
        }
        Ok(())
    }

    /// The body has been consumed: keep the connection or close it.
    fn finish_response(&mut self, conn: &mut HttpConnection) {
        if self.is_established_tunnel() {
            self.warn_on_tunnel_close(conn);
            self.connection_close_forced = false;
            self.abort.detach();
            return;
        }
        let close = should_close_connection(
            self.connection_close_forced,
            conn.is_transparent(),
            &self.request_headers,
            &self.response_headers,
            self.effective_version(),
        );
        if close {
            conn.close();
        } else if conn.has_pending_input() {
            if self.resolved.is_warn_extra_input() {
                tracing::warn!("Extra response data detected - closing connection");
            }
            conn.close();
        }
        self.connection_close_forced = false;
        self.abort.detach();
    }

    /// Read body bytes from `conn`. Finishes the response as soon as the
    /// decoder reaches the end of the body.
    pub(crate) fn read_body_from(&mut self, conn: &mut HttpConnection, buf: &mut [u8]) -> Result<usize> {
        let ResponseBody::Pending(decoder) = &mut self.body else {
            return Ok(0);
        };
        let result = conn.reader().and_then(|reader| decoder.read(reader, buf));
        match result {
            Ok(n) => {
                if decoder.is_complete() {
                    if let Some(trailers) = decoder.trailers() {
                        self.response_trailers = trailers.clone();
                    }
                    if decoder.is_close_delimited() {
                        self.connection_close_forced = true;
                    }
                    self.body = ResponseBody::None;
                    self.finish_response(conn);
                }
                Ok(n)
            }
            Err(e) => {
                conn.close();
                self.body = ResponseBody::None;
                self.connection_close_forced = false;
                self.abort.detach();
                Err(error::wire(e))
            }
        }
    }

    /// Read the rest of the body into memory.
    pub(crate) fn read_body_to_end(&mut self, conn: &mut HttpConnection) -> Result<Bytes> {
        let mut content = Vec::new();
        let mut buf = [0u8; 8192];
        while matches!(self.body, ResponseBody::Pending(_)) {
            let n = self.read_body_from(conn, &mut buf)?;
            content.extend_from_slice(&buf[..n]);
        }
        Ok(Bytes::from(content))
    }

    /// Read and drop the rest of the body so the connection can be reused.
    pub(crate) fn discard_response_body(&mut self, conn: &mut HttpConnection) -> Result<()> {
        let mut scratch = [0u8; 4096];
        while matches!(self.body, ResponseBody::Pending(_)) {
            self.read_body_from(conn, &mut scratch)?;
        }
        Ok(())
    }

    /// One write/read cycle on `conn`. Returns the final status code.
    pub(crate) fn execute(&mut self, state: &HttpState, conn: &mut HttpConnection) -> Result<u16> {
        if self.is_aborted() {
            return Err(error::usage("method has been aborted"));
        }
        self.status_line = None;
        self.effective_version = None;
        self.response_headers.clear();
        self.response_trailers.clear();
        self.body = ResponseBody::None;
        self.connection_close_forced = false;
        self.request_sent = false;

        let timeout = self.resolved.socket_timeout.or(conn.params().socket_timeout);
        conn.set_socket_timeout(timeout).map_err(error::io)?;
        self.abort.attach(conn);

        self.write_request(state, conn)?;
        self.request_sent = true;
        self.read_response(state, conn)?;
        self.used = true;
        Ok(self.status_code())
    }
}
