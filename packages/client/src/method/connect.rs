//! The CONNECT method used to open a tunnel through a proxy

use super::core::{HttpMethod, MethodKind};
use crate::connect::{HostConfiguration, HttpConnection};

impl HttpMethod {
    /// A `CONNECT host:port` request for the target of `config`.
    ///
    /// The target is taken from the connection it runs on, so `config`
    /// only supplies the host parameters the request is resolved against.
    #[must_use]
    pub fn connect(config: &HostConfiguration) -> HttpMethod {
        let mut method = HttpMethod::blank(http::Method::CONNECT, "/".to_string(), None);
        method.kind = MethodKind::Connect;
        method.follow_redirects = false;
        method.bind_defaults([&config.params().method]);
        method
    }

    /// True for a CONNECT the proxy accepted.
    pub(crate) fn is_established_tunnel(&self) -> bool {
        self.kind == MethodKind::Connect
            && self.status_line.as_ref().is_some_and(|s| s.is_success())
    }

    /// An accepted tunnel stays open whatever the proxy says about the
    /// connection; a `close` directive is only worth a warning.
    pub(crate) fn warn_on_tunnel_close(&self, conn: &HttpConnection) {
        let header = (!conn.is_transparent())
            .then(|| self.response_headers.first("Proxy-Connection"))
            .flatten()
            .or_else(|| self.response_headers.first("Connection"));
        if let Some(header) = header
            && header.value().eq_ignore_ascii_case("close")
        {
            tracing::warn!(
                "Invalid header encountered '{}' in response {}",
                header,
                self.status_line.as_ref().map(ToString::to_string).unwrap_or_default()
            );
        }
    }
}
