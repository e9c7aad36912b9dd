//! Cookie specs: parsing, validation and matching rules

use std::fmt;
use std::time::{Duration, SystemTime};

use super::core::{Cookie, normalize_domain};
use super::utils::{default_path, domain_match, path_match, split_set_cookie, validate_cookie};

/// A `Set-Cookie` value or cookie attribute that cannot be accepted.
#[derive(Debug, thiserror::Error)]
#[error("malformed cookie: {0}")]
pub struct MalformedCookie(pub String);

/// Where a request goes, as far as cookie rules are concerned.
#[derive(Debug, Clone, Copy)]
pub struct CookieOrigin<'a> {
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
    pub secure: bool,
}

impl<'a> CookieOrigin<'a> {
    #[must_use]
    pub fn new(host: &'a str, port: u16, path: &'a str, secure: bool) -> Self {
        Self {
            host,
            port,
            path: if path.trim().is_empty() { "/" } else { path },
            secure,
        }
    }
}

/// Rules for turning `Set-Cookie` headers into cookies and picking the
/// cookies a request should carry.
pub trait CookieSpec: Send + Sync + fmt::Debug {
    /// Parse one response header value into cookies with defaults filled in
    /// from the origin.
    fn parse(&self, origin: &CookieOrigin<'_>, header: &str) -> Result<Vec<Cookie>, MalformedCookie>;

    /// Reject cookies the origin may not set.
    fn validate(&self, origin: &CookieOrigin<'_>, cookie: &Cookie) -> Result<(), MalformedCookie>;

    /// True if `cookie` should be sent to `origin`.
    fn matches(&self, origin: &CookieOrigin<'_>, cookie: &Cookie) -> bool;

    /// Cookies from `candidates` to send to `origin`, most specific path first.
    fn match_cookies(&self, origin: &CookieOrigin<'_>, candidates: &[Cookie]) -> Vec<Cookie> {
        let mut matched: Vec<Cookie> = candidates
            .iter()
            .filter(|cookie| self.matches(origin, cookie))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.path().len().cmp(&a.path().len()));
        matched
    }

    fn format_cookie(&self, cookie: &Cookie) -> String {
        format!("{}={}", cookie.name(), cookie.value())
    }

    fn format_cookies(&self, cookies: &[Cookie]) -> String {
        cookies
            .iter()
            .map(|cookie| self.format_cookie(cookie))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Lenient cookie handling compatible with what browsers accept.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserCompatSpec;

impl BrowserCompatSpec {
    fn parse_one(origin: &CookieOrigin<'_>, raw: &str) -> Result<Cookie, MalformedCookie> {
        let parsed =
            cookie::Cookie::parse(raw).map_err(|e| MalformedCookie(format!("{raw:?}: {e}")))?;
        validate_cookie(parsed.name(), parsed.value()).map_err(MalformedCookie)?;

        let domain_attr = parsed.domain().filter(|d| !d.trim().is_empty());
        let path_attr = parsed.path().filter(|p| !p.trim().is_empty());
        let mut cookie = Cookie::new(
            domain_attr.unwrap_or(origin.host),
            parsed.name(),
            parsed.value(),
            path_attr.unwrap_or_else(|| default_path(origin.path)),
        )
        .with_secure(parsed.secure().unwrap_or(false))
        .with_http_only(parsed.http_only().unwrap_or(false))
        .with_attributes_specified(domain_attr.is_some(), path_attr.is_some());

        let expires = match parsed.max_age() {
            Some(max_age) => Some(
                Duration::try_from(max_age)
                    .ok()
                    .filter(|age| !age.is_zero())
                    .map_or(SystemTime::UNIX_EPOCH, |age| SystemTime::now() + age),
            ),
            None => parsed.expires_datetime().map(SystemTime::from),
        };
        if let Some(expires) = expires {
            cookie = cookie.with_expires(expires);
        }
        Ok(cookie)
    }
}

impl CookieSpec for BrowserCompatSpec {
    fn parse(&self, origin: &CookieOrigin<'_>, header: &str) -> Result<Vec<Cookie>, MalformedCookie> {
        split_set_cookie(header)
            .into_iter()
            .map(|raw| Self::parse_one(origin, raw))
            .collect()
    }

    fn validate(&self, origin: &CookieOrigin<'_>, cookie: &Cookie) -> Result<(), MalformedCookie> {
        let host = normalize_domain(origin.host);
        if host.contains('.') {
            if !domain_match(&host, cookie.domain()) {
                return Err(MalformedCookie(format!(
                    "illegal domain attribute \"{}\"; domain of origin: \"{host}\"",
                    cookie.domain()
                )));
            }
        } else if host != cookie.domain() {
            return Err(MalformedCookie(format!(
                "illegal domain attribute \"{}\"; domain of origin: \"{host}\"",
                cookie.domain()
            )));
        }
        if !origin.path.starts_with(cookie.path()) {
            return Err(MalformedCookie(format!(
                "illegal path attribute \"{}\"; path of origin: \"{}\"",
                cookie.path(),
                origin.path
            )));
        }
        Ok(())
    }

    fn matches(&self, origin: &CookieOrigin<'_>, cookie: &Cookie) -> bool {
        let host = normalize_domain(origin.host);
        !cookie.is_expired()
            && domain_match(&host, cookie.domain())
            && path_match(origin.path, cookie.path())
            && (!cookie.is_secure() || origin.secure)
    }
}

/// Stores nothing and sends nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreCookiesSpec;

impl CookieSpec for IgnoreCookiesSpec {
    fn parse(&self, _origin: &CookieOrigin<'_>, _header: &str) -> Result<Vec<Cookie>, MalformedCookie> {
        Ok(Vec::new())
    }

    fn validate(&self, _origin: &CookieOrigin<'_>, _cookie: &Cookie) -> Result<(), MalformedCookie> {
        Ok(())
    }

    fn matches(&self, _origin: &CookieOrigin<'_>, _cookie: &Cookie) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> CookieOrigin<'static> {
        CookieOrigin::new("www.example.com", 80, "/app/index.html", false)
    }

    #[test]
    fn parse_fills_defaults_from_origin() {
        let cookies = BrowserCompatSpec
            .parse(&origin(), "sid=abc; HttpOnly")
            .expect("parse");
        assert_eq!(cookies.len(), 1);
        let cookie = &cookies[0];
        assert_eq!(cookie.domain(), "www.example.com");
        assert_eq!(cookie.path(), "/app");
        assert!(cookie.is_http_only());
        assert!(!cookie.is_domain_attribute_specified());
        assert!(!cookie.is_persistent());
    }

    #[test]
    fn parse_reads_attributes() {
        let cookies = BrowserCompatSpec
            .parse(&origin(), "a=1; Domain=.example.com; Path=/; Secure; Max-Age=60")
            .expect("parse");
        let cookie = &cookies[0];
        assert_eq!(cookie.domain(), "example.com");
        assert_eq!(cookie.path(), "/");
        assert!(cookie.is_secure());
        assert!(cookie.is_persistent());
        assert!(!cookie.is_expired());
        assert!(BrowserCompatSpec.validate(&origin(), cookie).is_ok());
    }

    #[test]
    fn zero_max_age_expires_immediately() {
        let cookies = BrowserCompatSpec
            .parse(&origin(), "gone=1; Max-Age=0")
            .expect("parse");
        assert!(cookies[0].is_expired());
    }

    #[test]
    fn foreign_domain_is_rejected() {
        let cookies = BrowserCompatSpec
            .parse(&origin(), "a=1; Domain=other.org")
            .expect("parse");
        assert!(BrowserCompatSpec.validate(&origin(), &cookies[0]).is_err());
    }

    #[test]
    fn foreign_path_is_rejected() {
        let cookies = BrowserCompatSpec
            .parse(&origin(), "a=1; Path=/admin")
            .expect("parse");
        assert!(BrowserCompatSpec.validate(&origin(), &cookies[0]).is_err());
    }

    #[test]
    fn secure_cookies_only_match_secure_origins() {
        let cookie = Cookie::new("example.com", "a", "1", "/").with_secure(true);
        let plain = CookieOrigin::new("example.com", 80, "/", false);
        let tls = CookieOrigin::new("example.com", 443, "/", true);
        assert!(!BrowserCompatSpec.matches(&plain, &cookie));
        assert!(BrowserCompatSpec.matches(&tls, &cookie));
    }

    #[test]
    fn matched_cookies_are_ordered_by_path_specificity() {
        let cookies = vec![
            Cookie::new("example.com", "root", "1", "/"),
            Cookie::new("example.com", "deep", "2", "/app"),
            Cookie::new("other.com", "x", "3", "/"),
        ];
        let origin = CookieOrigin::new("example.com", 80, "/app/page", false);
        let matched = BrowserCompatSpec.match_cookies(&origin, &cookies);
        assert_eq!(BrowserCompatSpec.format_cookies(&matched), "deep=2; root=1");
    }

    #[test]
    fn ignore_spec_never_matches() {
        let cookie = Cookie::new("example.com", "a", "1", "/");
        let origin = CookieOrigin::new("example.com", 80, "/", false);
        assert!(IgnoreCookiesSpec.match_cookies(&origin, &[cookie]).is_empty());
        assert!(IgnoreCookiesSpec.parse(&origin, "a=1").expect("parse").is_empty());
    }
}
