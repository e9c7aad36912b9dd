//! Header manipulation for redirects

use url::Url;

use crate::http::HeaderGroup;

/// Remove caller-supplied credentials and cookies when a redirect leaves
/// the original host or port. Engine-generated ones are rebuilt per request.
pub(crate) fn remove_sensitive_headers(headers: &mut HeaderGroup, next: &Url, previous: &Url) {
    let cross_host = next.host_str() != previous.host_str()
        || next.port_or_known_default() != previous.port_or_known_default();
    if cross_host {
        let removed = headers.remove("Authorization") + headers.remove("Cookie");
        if removed > 0 {
            tracing::debug!(
                "Dropped {} sensitive header(s) redirecting from {} to {}",
                removed,
                previous,
                next
            );
        }
    }
}
