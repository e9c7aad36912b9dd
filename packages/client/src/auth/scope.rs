//! Authentication scopes
//!
//! A scope names where a set of credentials applies. Any component may be
//! left unset, which makes it a wildcard during matching.

use std::fmt;

/// Host, port, realm and scheme a set of credentials applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AuthScope {
    host: Option<String>,
    port: Option<u16>,
    realm: Option<String>,
    scheme: Option<String>,
}

impl AuthScope {
    /// Matches every host, port, realm and scheme.
    pub const ANY: AuthScope = AuthScope {
        host: None,
        port: None,
        realm: None,
        scheme: None,
    };

    /// Host names and schemes are case-insensitive and stored lowercased.
    #[must_use]
    pub fn new(
        host: Option<&str>,
        port: Option<u16>,
        realm: Option<&str>,
        scheme: Option<&str>,
    ) -> Self {
        Self {
            host: host.map(str::to_ascii_lowercase),
            port,
            realm: realm.map(str::to_string),
            scheme: scheme.map(str::to_ascii_lowercase),
        }
    }

    /// Any realm and scheme on one host and port.
    #[must_use]
    pub fn for_host(host: &str, port: u16) -> Self {
        Self::new(Some(host), Some(port), None, None)
    }

    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    #[must_use]
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = Some(scheme.to_ascii_lowercase());
        self
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    #[must_use]
    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// How specifically `self` matches `other`, or `None` if they conflict.
    ///
    /// Agreement on scheme scores 1, realm 2, port 4 and host 8. A component
    /// that differs only because one side is a wildcard scores nothing; two
    /// concrete values that differ rule the match out.
    #[must_use]
    pub fn match_score(&self, other: &AuthScope) -> Option<u32> {
        fn component<T: PartialEq>(a: &Option<T>, b: &Option<T>, weight: u32) -> Option<u32> {
            match (a, b) {
                _ if a == b => Some(weight),
                (Some(_), Some(_)) => None,
                _ => Some(0),
            }
        }

        Some(
            component(&self.scheme, &other.scheme, 1)?
                + component(&self.realm, &other.realm, 2)?
                + component(&self.port, &other.port, 4)?
                + component(&self.host, &other.host, 8)?,
        )
    }

    /// The most specific of `candidates` compatible with `self`.
    pub fn best_match<'a, I>(&self, candidates: I) -> Option<&'a AuthScope>
    where
        I: IntoIterator<Item = &'a AuthScope>,
    {
        let mut best: Option<(u32, &'a AuthScope)> = None;
        for candidate in candidates {
            if let Some(score) = self.match_score(candidate)
                && best.is_none_or(|(top, _)| score > top)
            {
                best = Some((score, candidate));
            }
        }
        best.map(|(_, scope)| scope)
    }
}

impl fmt::Display for AuthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scheme {
            Some(scheme) => write!(f, "{} ", scheme.to_ascii_uppercase())?,
            None => f.write_str("<any scheme> ")?,
        }
        match &self.realm {
            Some(realm) => write!(f, "'{realm}'")?,
            None => f.write_str("<any realm>")?,
        }
        match &self.host {
            Some(host) => write!(f, "@{host}")?,
            None => f.write_str("@<any host>")?,
        }
        match self.port {
            Some(port) => write!(f, ":{port}"),
            None => f.write_str(":<any port>"),
        }
    }
}
