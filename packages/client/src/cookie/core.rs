//! HTTP cookies and the policies that select a cookie spec

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::spec::{BrowserCompatSpec, CookieSpec, IgnoreCookiesSpec};

/// A cookie as stored in [`HttpState`](crate::state::HttpState).
///
/// Two cookies are the same cookie when name, domain and path agree; a newer
/// one replaces the older in the state.
#[derive(Clone)]
pub struct Cookie {
    name: String,
    value: String,
    domain: String,
    path: String,
    expires: Option<SystemTime>,
    secure: bool,
    http_only: bool,
    domain_attribute_specified: bool,
    path_attribute_specified: bool,
}

impl Cookie {
    /// A session cookie for `domain` and `path`. The domain is stored
    /// lowercased and without a leading dot.
    pub fn new(
        domain: impl AsRef<str>,
        name: impl Into<String>,
        value: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: normalize_domain(domain.as_ref()),
            path: path.into(),
            expires: None,
            secure: false,
            http_only: false,
            domain_attribute_specified: false,
            path_attribute_specified: false,
        }
    }

    #[must_use]
    pub fn with_expires(mut self, expires: SystemTime) -> Self {
        self.expires = Some(expires);
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub(crate) fn with_attributes_specified(mut self, domain: bool, path: bool) -> Self {
        self.domain_attribute_specified = domain;
        self.path_attribute_specified = path;
        self
    }

    /// The name of the cookie.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value of the cookie.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The cookie expiration time; `None` for a session cookie.
    #[must_use]
    pub fn expires(&self) -> Option<SystemTime> {
        self.expires
    }

    /// Returns true if the 'Secure' directive is enabled.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Returns true if the '`HttpOnly`' directive is enabled.
    #[must_use]
    pub fn is_http_only(&self) -> bool {
        self.http_only
    }

    #[must_use]
    pub fn is_domain_attribute_specified(&self) -> bool {
        self.domain_attribute_specified
    }

    #[must_use]
    pub fn is_path_attribute_specified(&self) -> bool {
        self.path_attribute_specified
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.expires.is_some()
    }

    /// True if the cookie expired at or before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    /// Same name, domain and path.
    #[must_use]
    pub fn same_identity(&self, other: &Cookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

pub(crate) fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_start_matches('.').to_ascii_lowercase()
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("expires", &self.expires)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Which cookie spec a method uses to parse and match cookies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookiePolicy {
    /// Lenient parsing in the manner of common browsers.
    #[default]
    BrowserCompatibility,
    /// Never send or store cookies.
    IgnoreCookies,
}

static BROWSER_COMPAT: BrowserCompatSpec = BrowserCompatSpec;
static IGNORE_COOKIES: IgnoreCookiesSpec = IgnoreCookiesSpec;

impl CookiePolicy {
    #[must_use]
    pub fn spec(self) -> &'static dyn CookieSpec {
        match self {
            CookiePolicy::BrowserCompatibility => &BROWSER_COMPAT,
            CookiePolicy::IgnoreCookies => &IGNORE_COOKIES,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn domain_is_normalized() {
        let cookie = Cookie::new(".Example.COM", "a", "1", "/");
        assert_eq!(cookie.domain(), "example.com");
        assert!(cookie.same_identity(&Cookie::new("example.com", "a", "2", "/")));
        assert!(!cookie.same_identity(&Cookie::new("example.com", "a", "2", "/x")));
    }

    #[test]
    fn expiry_is_inclusive() {
        let now = SystemTime::now();
        let cookie = Cookie::new("h", "a", "1", "/").with_expires(now);
        assert!(cookie.is_expired_at(now));
        assert!(!cookie.is_expired_at(now - Duration::from_secs(1)));
        assert!(!Cookie::new("h", "a", "1", "/").is_expired());
    }
}
