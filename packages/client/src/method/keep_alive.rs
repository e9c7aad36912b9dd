//! Persistent connection decision

use crate::http::{Header, HeaderElement, HeaderGroup, HttpVersion};

fn directive(header: &Header) -> Option<bool> {
    let elements = HeaderElement::parse_all(header.value());
    if elements.iter().any(|e| e.name.eq_ignore_ascii_case("close")) {
        Some(true)
    } else if elements.iter().any(|e| e.name.eq_ignore_ascii_case("keep-alive")) {
        Some(false)
    } else {
        tracing::debug!("Unrecognized value for '{}' header: {}", header.name(), header.value());
        None
    }
}

/// Whether a connection must be closed once the current response is consumed.
///
/// A forced close wins. Otherwise the first of `Proxy-Connection` (only when
/// talking to a proxy), the response `Connection` and the request
/// `Connection` header decides on `close` or `keep-alive`. Without a usable
/// directive HTTP/1.0 and older close, HTTP/1.1 keeps the connection.
#[must_use]
pub fn should_close_connection(
    forced: bool,
    transparent: bool,
    request: &HeaderGroup,
    response: &HeaderGroup,
    version: HttpVersion,
) -> bool {
    if forced {
        tracing::debug!("Should force-close connection.");
        return true;
    }

    let header = (!transparent)
        .then(|| response.first("Proxy-Connection"))
        .flatten()
        .or_else(|| response.first("Connection"))
        .or_else(|| request.first("Connection"));

    if let Some(decision) = header.and_then(directive) {
        return decision;
    }

    let close = version <= HttpVersion::HTTP_1_0;
    tracing::debug!(
        "Resorting to protocol version default close connection policy: {} for {}",
        if close { "close" } else { "keep alive" },
        version
    );
    close
}
