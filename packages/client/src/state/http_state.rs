//! Cookies and credentials shared across the methods of one client

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use hashbrown::HashMap;

use crate::auth::{AuthScope, Credentials};
use crate::cookie::{Cookie, CookieOrigin, CookieSpec};

/// Persistent HTTP state.
///
/// Each operation locks only what it touches; there is no atomicity across
/// calls, so a read-then-write sequence from two threads can interleave.
#[derive(Default)]
pub struct HttpState {
    cookies: Mutex<Vec<Cookie>>,
    credentials: Mutex<HashMap<AuthScope, Credentials>>,
    proxy_credentials: Mutex<HashMap<AuthScope, Credentials>>,
    preemptive: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exact scope first, then the most specific compatible one.
fn match_credentials(map: &HashMap<AuthScope, Credentials>, scope: &AuthScope) -> Option<Credentials> {
    if let Some(credentials) = map.get(scope) {
        return Some(credentials.clone());
    }
    scope
        .best_match(map.keys())
        .and_then(|best| map.get(best))
        .cloned()
}

impl HttpState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a cookie, replacing one with the same name, domain and path.
    /// An already expired cookie only removes its predecessor.
    pub fn add_cookie(&self, cookie: Cookie) {
        let mut cookies = lock(&self.cookies);
        if let Some(pos) = cookies.iter().position(|c| c.same_identity(&cookie)) {
            cookies.remove(pos);
        }
        if !cookie.is_expired() {
            cookies.push(cookie);
        }
    }

    pub fn add_cookies(&self, cookies: impl IntoIterator<Item = Cookie>) {
        for cookie in cookies {
            self.add_cookie(cookie);
        }
    }

    /// Snapshot of the stored cookies.
    #[must_use]
    pub fn cookies(&self) -> Vec<Cookie> {
        lock(&self.cookies).clone()
    }

    /// Cookies `spec` selects for a request to `origin`.
    #[must_use]
    pub fn matching_cookies(&self, spec: &dyn CookieSpec, origin: &CookieOrigin<'_>) -> Vec<Cookie> {
        spec.match_cookies(origin, &lock(&self.cookies))
    }

    /// Drop cookies that expired at or before `now`. Returns true if any were removed.
    pub fn purge_expired_cookies(&self, now: SystemTime) -> bool {
        let mut cookies = lock(&self.cookies);
        let before = cookies.len();
        cookies.retain(|c| !c.is_expired_at(now));
        cookies.len() != before
    }

    pub fn clear_cookies(&self) {
        lock(&self.cookies).clear();
    }

    pub fn set_credentials(&self, scope: AuthScope, credentials: Credentials) {
        lock(&self.credentials).insert(scope, credentials);
    }

    /// Credentials for an origin server scope.
    #[must_use]
    pub fn credentials(&self, scope: &AuthScope) -> Option<Credentials> {
        match_credentials(&lock(&self.credentials), scope)
    }

    pub fn set_proxy_credentials(&self, scope: AuthScope, credentials: Credentials) {
        lock(&self.proxy_credentials).insert(scope, credentials);
    }

    /// Credentials for a proxy scope.
    #[must_use]
    pub fn proxy_credentials(&self, scope: &AuthScope) -> Option<Credentials> {
        match_credentials(&lock(&self.proxy_credentials), scope)
    }

    pub fn clear_credentials(&self) {
        lock(&self.credentials).clear();
    }

    pub fn clear_proxy_credentials(&self) {
        lock(&self.proxy_credentials).clear();
    }

    /// Forget cookies and all credentials.
    pub fn clear(&self) {
        self.clear_cookies();
        self.clear_credentials();
        self.clear_proxy_credentials();
    }

    /// Send stored username/password credentials before any challenge.
    pub fn set_authentication_preemptive(&self, preemptive: bool) {
        self.preemptive.store(preemptive, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_authentication_preemptive(&self) -> bool {
        self.preemptive.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for HttpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpState")
            .field("cookies", &lock(&self.cookies).len())
            .field("credentials", &lock(&self.credentials).keys().collect::<Vec<_>>())
            .field(
                "proxy_credentials",
                &lock(&self.proxy_credentials).keys().collect::<Vec<_>>(),
            )
            .field("preemptive", &self.is_authentication_preemptive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cookie::BrowserCompatSpec;

    #[test]
    fn newer_cookie_replaces_older() {
        let state = HttpState::new();
        state.add_cookie(Cookie::new("example.com", "a", "1", "/"));
        state.add_cookie(Cookie::new("example.com", "a", "2", "/"));
        state.add_cookie(Cookie::new("example.com", "a", "3", "/other"));
        let cookies = state.cookies();
        assert_eq!(cookies.len(), 2);
        let values: Vec<&str> = cookies.iter().map(Cookie::value).collect();
        assert_eq!(values, ["2", "3"]);
        let root = cookies.iter().find(|c| c.path() == "/").expect("root cookie");
        assert_eq!(root.value(), "2");
    }

    #[test]
    fn expired_cookie_deletes_existing() {
        let state = HttpState::new();
        state.add_cookie(Cookie::new("example.com", "a", "1", "/"));
        state.add_cookie(
            Cookie::new("example.com", "a", "", "/").with_expires(SystemTime::UNIX_EPOCH),
        );
        assert!(state.cookies().is_empty());
    }

    #[test]
    fn purge_drops_only_expired() {
        let state = HttpState::new();
        let soon = SystemTime::now() + Duration::from_secs(60);
        state.add_cookie(Cookie::new("h.com", "keep", "1", "/"));
        state.add_cookie(Cookie::new("h.com", "old", "1", "/").with_expires(soon));
        assert!(state.purge_expired_cookies(soon + Duration::from_secs(1)));
        assert_eq!(state.cookies().len(), 1);
        assert!(!state.purge_expired_cookies(soon + Duration::from_secs(1)));
    }

    #[test]
    fn matching_cookies_uses_spec() {
        let state = HttpState::new();
        state.add_cookie(Cookie::new("example.com", "a", "1", "/"));
        state.add_cookie(Cookie::new("example.org", "b", "1", "/"));
        let origin = CookieOrigin::new("www.example.com", 80, "/", false);
        let matched = state.matching_cookies(&BrowserCompatSpec, &origin);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name(), "a");
    }

    #[test]
    fn credentials_fall_back_to_best_match() {
        let state = HttpState::new();
        state.set_credentials(AuthScope::ANY, Credentials::username_password("any", "x"));
        state.set_credentials(
            AuthScope::new(Some("example.com"), None, None, None),
            Credentials::username_password("host", "x"),
        );

        let wanted = AuthScope::new(Some("example.com"), Some(80), Some("r"), Some("basic"));
        assert_eq!(state.credentials(&wanted).map(|c| c.username().to_string()).as_deref(), Some("host"));

        let other = AuthScope::new(Some("other.com"), Some(80), Some("r"), Some("basic"));
        assert_eq!(state.credentials(&other).map(|c| c.username().to_string()).as_deref(), Some("any"));
        assert!(state.proxy_credentials(&other).is_none());
    }
}
