//! The request/response unit
//!
//! An [`HttpMethod`] holds one request and, once executed, its response. The
//! wire protocol lives in the sibling `write` and `read` modules; this module
//! holds the state and the caller-facing accessors.

use std::borrow::BorrowMut;
use std::fmt;
use std::io::{self, Read};

use bytes::Bytes;
use url::Url;

use super::abort::AbortHandle;
use super::entity::RequestEntity;
use crate::auth::AuthState;
use crate::config::MethodParams;
use crate::error::{self, Result};
use crate::http::{BodyDecoder, Header, HeaderGroup, HttpVersion, StatusLine};
use crate::pool::PooledConnection;

/// What a method does on the wire beyond the generic request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MethodKind {
    Standard,
    /// `CONNECT host:port` to a proxy; a 2xx answer has no body.
    Connect,
}

/// Where the response body currently is.
#[derive(Debug)]
pub(crate) enum ResponseBody {
    /// No body, or it was consumed.
    None,
    /// Still on the connection.
    Pending(BodyDecoder),
    /// Read into memory.
    Buffered(Bytes),
}

/// One HTTP method invocation.
pub struct HttpMethod {
    pub(crate) name: http::Method,
    pub(crate) kind: MethodKind,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) origin: Option<Url>,
    pub(crate) request_headers: HeaderGroup,
    pub(crate) entity: Option<Box<dyn RequestEntity>>,
    pub(crate) repeat_count: u32,
    pub(crate) params: MethodParams,
    pub(crate) resolved: MethodParams,
    pub(crate) follow_redirects: bool,
    pub(crate) do_authentication: bool,
    pub(crate) status_line: Option<StatusLine>,
    pub(crate) effective_version: Option<HttpVersion>,
    pub(crate) response_headers: HeaderGroup,
    pub(crate) response_trailers: HeaderGroup,
    pub(crate) body: ResponseBody,
    pub(crate) connection: Option<PooledConnection>,
    pub(crate) connection_close_forced: bool,
    pub(crate) used: bool,
    pub(crate) request_sent: bool,
    pub(crate) abort: AbortHandle,
    pub(crate) host_auth_state: AuthState,
    pub(crate) proxy_auth_state: AuthState,
}

fn split_path(target: &str) -> (String, Option<String>) {
    let target = target.split('#').next().unwrap_or_default();
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (target, None),
    };
    let path = if path.is_empty() { "/" } else { path };
    (path.to_string(), query)
}

fn origin_of(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

impl HttpMethod {
    /// A method for `uri`, either absolute (`http://host/path?query`), which
    /// also names the target host, or a path relative to the client's
    /// default host.
    pub fn new(name: http::Method, uri: &str) -> Result<Self> {
        let mut method = Self::blank(name, "/".to_string(), None);
        match Url::parse(uri) {
            Ok(url) => method.set_uri(&url)?,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let (path, query) = split_path(uri);
                method.path = path;
                method.query = query;
            }
            Err(e) => return Err(error::builder(format!("invalid request URI '{uri}': {e}"))),
        }
        Ok(method)
    }

    pub(crate) fn blank(name: http::Method, path: String, query: Option<String>) -> Self {
        let follow_redirects = matches!(name, http::Method::GET | http::Method::HEAD);
        let params = MethodParams::new();
        let resolved = params.layered([]);
        Self {
            name,
            kind: MethodKind::Standard,
            path,
            query,
            origin: None,
            request_headers: HeaderGroup::new(),
            entity: None,
            repeat_count: 0,
            params,
            resolved,
            follow_redirects,
            do_authentication: true,
            status_line: None,
            effective_version: None,
            response_headers: HeaderGroup::new(),
            response_trailers: HeaderGroup::new(),
            body: ResponseBody::None,
            connection: None,
            connection_close_forced: false,
            used: false,
            request_sent: false,
            abort: AbortHandle::default(),
            host_auth_state: AuthState::new(),
            proxy_auth_state: AuthState::new(),
        }
    }

    pub fn get(uri: &str) -> Result<Self> {
        Self::new(http::Method::GET, uri)
    }

    /// HEAD responses never carry a body, whatever their headers say.
    pub fn head(uri: &str) -> Result<Self> {
        Self::new(http::Method::HEAD, uri)
    }

    pub fn post(uri: &str) -> Result<Self> {
        Self::new(http::Method::POST, uri)
    }

    pub fn put(uri: &str) -> Result<Self> {
        Self::new(http::Method::PUT, uri)
    }

    pub fn delete(uri: &str) -> Result<Self> {
        Self::new(http::Method::DELETE, uri)
    }

    pub fn options(uri: &str) -> Result<Self> {
        Self::new(http::Method::OPTIONS, uri)
    }

    pub fn trace(uri: &str) -> Result<Self> {
        Self::new(http::Method::TRACE, uri)
    }

    #[must_use]
    pub fn name(&self) -> &http::Method {
        &self.name
    }

    /// POST, PUT and PATCH carry a body and never follow redirects on their own.
    #[must_use]
    pub fn is_entity_enclosing(&self) -> bool {
        matches!(
            self.name,
            http::Method::POST | http::Method::PUT | http::Method::PATCH
        )
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        self.path = if path.is_empty() { "/".to_string() } else { path };
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn set_query(&mut self, query: Option<&str>) {
        self.query = query.map(|q| q.trim_start_matches('?').to_string());
    }

    /// Retarget at an absolute URI: path, query and target host.
    pub fn set_uri(&mut self, url: &Url) -> Result<()> {
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(error::builder("request URI has no host").with_url(url.clone()));
        }
        self.path = url.path().to_string();
        self.query = url.query().map(str::to_string);
        self.origin = Some(origin_of(url));
        Ok(())
    }

    /// The absolute URI, if the method names its own host.
    #[must_use]
    pub fn uri(&self) -> Option<Url> {
        let origin = self.origin.as_ref()?;
        let mut url = origin.clone();
        url.set_path(&self.path);
        url.set_query(self.query.as_deref());
        Some(url)
    }

    /// `path[?query]` as written on the request line.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    #[must_use]
    pub fn params(&self) -> &MethodParams {
        &self.params
    }

    /// Replace this method's own parameters. Host and client defaults are
    /// layered underneath again when the method is executed.
    pub fn set_params(&mut self, params: MethodParams) {
        self.resolved = params.layered([]);
        self.params = params;
    }

    /// Resolve the parameter chain: own values first, then `defaults`
    /// nearest first, then the global defaults.
    pub(crate) fn bind_defaults<'a>(&mut self, defaults: impl IntoIterator<Item = &'a MethodParams>) {
        self.resolved = self.params.layered(defaults);
    }

    /// The parameters in effect after layering.
    #[must_use]
    pub fn effective_params(&self) -> &MethodParams {
        &self.resolved
    }

    #[must_use]
    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    /// Entity enclosing methods cannot be redirected without the caller's involvement.
    pub fn set_follow_redirects(&mut self, follow: bool) -> Result<()> {
        if follow && self.is_entity_enclosing() {
            return Err(error::usage(
                "entity enclosing requests cannot be redirected without user intervention",
            ));
        }
        self.follow_redirects = follow;
        Ok(())
    }

    #[must_use]
    pub fn do_authentication(&self) -> bool {
        self.do_authentication
    }

    pub fn set_do_authentication(&mut self, enabled: bool) {
        self.do_authentication = enabled;
    }

    #[must_use]
    pub fn request_headers(&self) -> &HeaderGroup {
        &self.request_headers
    }

    /// Set a request header, replacing any with the same name.
    pub fn set_request_header(&mut self, name: &str, value: &str) {
        self.request_headers.set(Header::new(name, value));
    }

    pub fn add_request_header(&mut self, name: &str, value: &str) {
        self.request_headers.add(Header::new(name, value));
    }

    pub fn remove_request_header(&mut self, name: &str) {
        self.request_headers.remove(name);
    }

    #[must_use]
    pub fn request_header(&self, name: &str) -> Option<&Header> {
        self.request_headers.first(name)
    }

    pub fn set_request_entity(&mut self, entity: impl RequestEntity + 'static) {
        self.entity = Some(Box::new(entity));
    }

    #[must_use]
    pub fn request_entity(&self) -> Option<&dyn RequestEntity> {
        self.entity.as_deref()
    }

    #[must_use]
    pub fn status_line(&self) -> Option<&StatusLine> {
        self.status_line.as_ref()
    }

    /// Status code of the response, or 0 before one was read.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_line.as_ref().map_or(0, StatusLine::status_code)
    }

    #[must_use]
    pub fn status_text(&self) -> &str {
        self.status_line
            .as_ref()
            .map_or("", StatusLine::reason_phrase)
    }

    /// The version of the last response, or the requested one before that.
    #[must_use]
    pub fn effective_version(&self) -> HttpVersion {
        self.effective_version
            .unwrap_or_else(|| self.resolved.version())
    }

    #[must_use]
    pub fn response_headers(&self) -> &HeaderGroup {
        &self.response_headers
    }

    #[must_use]
    pub fn response_header(&self, name: &str) -> Option<&Header> {
        self.response_headers.first(name)
    }

    /// Trailers of a chunked response, available once the body was read.
    #[must_use]
    pub fn response_trailer_headers(&self) -> &HeaderGroup {
        &self.response_trailers
    }

    #[must_use]
    pub fn is_request_sent(&self) -> bool {
        self.request_sent
    }

    #[cfg(test)]
    pub(crate) fn mark_request_sent(&mut self) {
        self.request_sent = true;
    }

    /// True once an execution completed and read a final response head.
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.used
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// A handle that aborts this method from another thread.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Abort the method and close its connection.
    pub fn abort(&mut self) {
        self.abort.abort();
        if let Some(mut conn) = self.connection.take() {
            conn.close();
        }
        self.body = ResponseBody::None;
    }

    #[must_use]
    pub fn host_auth_state(&self) -> &AuthState {
        &self.host_auth_state
    }

    #[must_use]
    pub fn proxy_auth_state(&self) -> &AuthState {
        &self.proxy_auth_state
    }

    /// Reset for another execution: the response, the flags and both
    /// authentication states are cleared, request headers set by the engine
    /// are dropped. The target, entity and parameters are kept.
    pub fn recycle(&mut self) {
        self.release_connection();
        self.request_headers = self
            .request_headers
            .iter()
            .filter(|h| !h.is_auto_generated())
            .cloned()
            .collect();
        self.response_headers.clear();
        self.response_trailers.clear();
        self.status_line = None;
        self.effective_version = None;
        self.body = ResponseBody::None;
        self.connection_close_forced = false;
        self.used = false;
        self.request_sent = false;
        self.repeat_count = 0;
        self.abort.reset();
        self.host_auth_state.invalidate();
        self.proxy_auth_state.invalidate();
    }

    /// Forget a response whose connection was closed under it.
    pub(crate) fn abandon_response(&mut self) {
        self.body = ResponseBody::None;
        self.connection_close_forced = false;
        self.abort.detach();
    }

    /// Keep the connection until the body is read; release it at once if
    /// there is nothing left to read.
    pub(crate) fn attach_connection(&mut self, conn: PooledConnection) {
        if matches!(self.body, ResponseBody::Pending(_)) {
            self.connection = Some(conn);
        }
    }

    /// True while response bytes are still waiting on the connection.
    #[must_use]
    pub fn has_pending_body(&self) -> bool {
        matches!(self.body, ResponseBody::Pending(_))
    }

    /// Read from the response body.
    pub fn read_response_body(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !matches!(self.body, ResponseBody::Pending(_)) {
            return Ok(0);
        }
        let Some(mut conn) = self.connection.take() else {
            return Err(error::usage("response body connection has been released"));
        };
        let result = self.read_body_from(&mut conn, buf);
        if matches!(self.body, ResponseBody::Pending(_)) {
            self.connection = Some(conn);
        }
        result
    }

    /// The whole response body, read into memory on first use.
    pub fn response_body(&mut self) -> Result<Bytes> {
        if let ResponseBody::Buffered(bytes) = &self.body {
            return Ok(bytes.clone());
        }
        let mut content = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = self.read_response_body(&mut buf)?;
            if n == 0 {
                break;
            }
            content.extend_from_slice(&buf[..n]);
        }
        let bytes = Bytes::from(content);
        self.body = ResponseBody::Buffered(bytes.clone());
        Ok(bytes)
    }

    /// The response body decoded with the charset named by `Content-Type`.
    /// Unknown charsets are decoded as UTF-8, replacing invalid sequences.
    pub fn response_body_as_string(&mut self) -> Result<String> {
        let charset = self.response_charset();
        let bytes = self.response_body()?;
        Ok(decode_text(&bytes, charset.as_deref()))
    }

    /// The body as a stream. Reaching its end releases the connection.
    pub fn response_body_as_stream(&mut self) -> BodyReader<&mut HttpMethod> {
        BodyReader::new(self)
    }

    /// Take ownership of the method as a body stream.
    #[must_use]
    pub fn into_body_reader(self) -> BodyReader<HttpMethod> {
        BodyReader::new(self)
    }

    /// Finish with the response: an unread body is drained so the
    /// connection can be reused, or the connection is closed when its end
    /// is only marked by the peer closing it.
    pub fn release_connection(&mut self) {
        let Some(mut conn) = self.connection.take() else {
            return;
        };
        if let ResponseBody::Pending(decoder) = &self.body
            && decoder.is_close_delimited()
        {
            conn.close();
            self.body = ResponseBody::None;
            self.abort.detach();
            return;
        }
        if let Err(e) = self.discard_response_body(&mut conn) {
            tracing::debug!("Discarding response body failed: {}", e);
        }
    }

    fn response_charset(&self) -> Option<String> {
        let content_type = self.response_headers.first("Content-Type")?;
        content_type
            .elements()
            .into_iter()
            .find_map(|e| e.param("charset").map(str::to_string))
    }
}

pub(crate) fn decode_text(bytes: &[u8], charset: Option<&str>) -> String {
    match charset.map(str::to_ascii_lowercase).as_deref() {
        Some("iso-8859-1" | "latin1" | "latin-1" | "us-ascii" | "ascii") => {
            bytes.iter().map(|&b| char::from(b)).collect()
        }
        Some("utf-8" | "utf8") | None => String::from_utf8_lossy(bytes).into_owned(),
        Some(other) => {
            tracing::debug!("Unsupported charset {}; decoding as UTF-8", other);
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

impl Drop for HttpMethod {
    fn drop(&mut self) {
        if let Some(mut conn) = self.connection.take()
            && matches!(self.body, ResponseBody::Pending(_))
        {
            tracing::debug!("Method dropped with unread response body; closing connection");
            conn.close();
        }
    }
}

impl fmt::Debug for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpMethod")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("origin", &self.origin.as_ref().map(Url::as_str))
            .field("status", &self.status_code())
            .field("used", &self.used)
            .field("aborted", &self.is_aborted())
            .finish_non_exhaustive()
    }
}

/// Streams a response body out of a method, borrowed or owned.
pub struct BodyReader<M: BorrowMut<HttpMethod>> {
    method: M,
    offset: usize,
}

impl<M: BorrowMut<HttpMethod>> BodyReader<M> {
    fn new(method: M) -> Self {
        Self { method, offset: 0 }
    }

    pub fn method(&self) -> &HttpMethod {
        self.method.borrow()
    }

    pub fn into_inner(self) -> M {
        self.method
    }
}

impl<M: BorrowMut<HttpMethod>> Read for BodyReader<M> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let method = self.method.borrow_mut();
        if let ResponseBody::Buffered(bytes) = &method.body {
            let remaining = bytes.get(self.offset..).unwrap_or_default();
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.offset += n;
            return Ok(n);
        }
        method.read_response_body(buf).map_err(io::Error::other)
    }
}

impl<M: BorrowMut<HttpMethod>> fmt::Debug for BodyReader<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyReader")
            .field("method", self.method.borrow())
            .field("offset", &self.offset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_uri_splits_query() {
        let method = HttpMethod::get("/search?q=rust#top").expect("method");
        assert_eq!(method.path(), "/search");
        assert_eq!(method.query(), Some("q=rust"));
        assert!(method.uri().is_none());
        assert!(method.follow_redirects());
    }

    #[test]
    fn absolute_uri_names_host() {
        let method = HttpMethod::post("http://example.com:8080/a/b?x=1").expect("method");
        assert_eq!(method.path(), "/a/b");
        assert_eq!(
            method.uri().map(String::from).as_deref(),
            Some("http://example.com:8080/a/b?x=1")
        );
        assert!(!method.follow_redirects());
    }

    #[test]
    fn entity_enclosing_methods_refuse_redirects() {
        let mut method = HttpMethod::put("/upload").expect("method");
        assert!(method.set_follow_redirects(true).is_err());
        assert!(method.set_follow_redirects(false).is_ok());
        let mut get = HttpMethod::get("/").expect("method");
        get.set_follow_redirects(false).expect("get may opt out");
        assert!(!get.follow_redirects());
    }

    #[test]
    fn abort_handle_is_shared() {
        let method = HttpMethod::get("/").expect("method");
        let handle = method.abort_handle();
        handle.abort();
        assert!(method.is_aborted());
    }

    #[test]
    fn latin1_bodies_decode_per_byte() {
        assert_eq!(decode_text(b"caf\xe9", Some("ISO-8859-1")), "caf\u{e9}");
        assert_eq!(decode_text("caf\u{e9}".as_bytes(), None), "caf\u{e9}");
        assert_eq!(decode_text(b"\xff", Some("utf-8")), "\u{fffd}");
    }
}
