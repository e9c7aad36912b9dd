//! Cookie matching helpers

/// Domain match: equal, or `host` is a subdomain of `domain`.
/// Both sides are expected lowercased, `domain` without a leading dot.
#[must_use]
pub fn domain_match(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

/// Path match: `path` equals `cookie_path` or continues it at a `/` boundary.
#[must_use]
pub fn path_match(path: &str, cookie_path: &str) -> bool {
    if !path.starts_with(cookie_path) {
        return false;
    }
    path.len() == cookie_path.len()
        || cookie_path.ends_with('/')
        || path.as_bytes()[cookie_path.len()] == b'/'
}

/// Default cookie path for a request path: everything before the last `/`,
/// or `/` itself.
#[must_use]
pub fn default_path(request_path: &str) -> &str {
    match request_path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &request_path[..idx],
    }
}

/// Split a `Set-Cookie` value that carries several cookies separated by
/// commas. Commas inside an `Expires` date do not separate cookies.
#[must_use]
pub fn split_set_cookie(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut attr_start = 0;
    for (i, c) in value.char_indices() {
        match c {
            ';' => attr_start = i + 1,
            ',' => {
                let attr = value[attr_start..i].trim_start();
                let in_date = attr
                    .get(..8)
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case("expires="));
                if !in_date {
                    parts.push(value[start..i].trim());
                    start = i + 1;
                    attr_start = i + 1;
                }
            }
            _ => {}
        }
    }
    parts.push(value[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Validate cookie name and value according to RFC 6265
///
/// # Errors
///
/// Returns an error message as a `String` if validation fails:
/// - If the cookie name is empty
/// - If the cookie name contains control characters or RFC 6265 separator characters: `(),/<>@[\\]{}`
/// - If the cookie value contains control characters (except tab character)
pub fn validate_cookie(name: &str, value: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Cookie name cannot be empty".to_string());
    }

    for ch in name.chars() {
        if ch.is_control() || "(),/<>@[\\]{}".contains(ch) {
            return Err(format!("Invalid character '{ch}' in cookie name"));
        }
    }

    for ch in value.chars() {
        if ch.is_control() && ch != '\t' {
            return Err(format!("Invalid character '{ch}' in cookie value"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_matching_respects_label_boundaries() {
        assert!(domain_match("example.com", "example.com"));
        assert!(domain_match("www.example.com", "example.com"));
        assert!(!domain_match("badexample.com", "example.com"));
        assert!(!domain_match("example.com", "www.example.com"));
    }

    #[test]
    fn path_matching_respects_segments() {
        assert!(path_match("/app/page", "/app"));
        assert!(path_match("/app/", "/app/"));
        assert!(path_match("/app", "/app"));
        assert!(!path_match("/application", "/app"));
        assert!(path_match("/anything", "/"));
    }

    #[test]
    fn default_path_strips_last_segment() {
        assert_eq!(default_path("/a/b/c.html"), "/a/b");
        assert_eq!(default_path("/index.html"), "/");
        assert_eq!(default_path(""), "/");
    }

    #[test]
    fn expires_comma_does_not_split() {
        let parts =
            split_set_cookie("a=1; Expires=Wed, 21 Oct 2099 07:28:00 GMT; Path=/, b=2");
        assert_eq!(
            parts,
            vec!["a=1; Expires=Wed, 21 Oct 2099 07:28:00 GMT; Path=/", "b=2"]
        );
    }

    #[test]
    fn rejects_separator_in_name() {
        assert!(validate_cookie("ok", "v").is_ok());
        assert!(validate_cookie("bad/name", "v").is_err());
        assert!(validate_cookie("", "v").is_err());
    }
}
