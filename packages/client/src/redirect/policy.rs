//! Redirect resolution and loop protection

use hashbrown::HashSet;
use url::Url;

use crate::error::{self, Result};

/// Status codes that carry a `Location` to follow.
#[must_use]
pub fn is_redirect_status(code: u16) -> bool {
    matches!(code, 301 | 302 | 303 | 307 | 308)
}

/// Resolve a `Location` value against the URI that produced it.
///
/// Returns `None` when the value is unusable: relative while relative
/// redirects are rejected, or not a URI at all. Both are soft failures and
/// the redirect response goes back to the caller.
#[must_use]
pub fn resolve_location(current: &Url, location: &str, reject_relative: bool) -> Option<Url> {
    let location = location.trim();
    match Url::parse(location) {
        Ok(absolute) => Some(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            if reject_relative {
                tracing::warn!("Relative redirect location '{}' not allowed", location);
                return None;
            }
            tracing::debug!("Redirect URI is not absolute - parsing as relative");
            match current.join(location) {
                Ok(resolved) => Some(resolved),
                Err(e) => {
                    tracing::warn!("Invalid redirect location '{}': {}", location, e);
                    None
                }
            }
        }
        Err(e) => {
            tracing::warn!("Invalid redirect location '{}': {}", location, e);
            None
        }
    }
}

/// The identity a redirect loop is detected on: query and fragment removed.
fn loop_key(url: &Url) -> Url {
    let mut key = url.clone();
    key.set_query(None);
    key.set_fragment(None);
    key
}

/// Hop count and visited locations for one `execute_method` call.
#[derive(Debug, Default)]
pub struct RedirectTracker {
    visited: HashSet<Url>,
    count: u32,
}

impl RedirectTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Record a hop from `current` to `next`.
    ///
    /// Fails when `next` was already visited (unless circular redirects are
    /// allowed) or when the hop uses up the `max` budget.
    pub fn follow(&mut self, current: &Url, next: &Url, allow_circular: bool, max: u32) -> Result<()> {
        if !allow_circular {
            self.visited.insert(loop_key(current));
            let key = loop_key(next);
            if self.visited.contains(&key) {
                return Err(error::circular_redirect(key));
            }
        }
        self.count += 1;
        if self.count >= max {
            return Err(error::max_redirects(max));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("url")
    }

    #[test]
    fn redirect_statuses() {
        for code in [301, 302, 303, 307, 308] {
            assert!(is_redirect_status(code));
        }
        assert!(!is_redirect_status(300));
        assert!(!is_redirect_status(304));
    }

    #[test]
    fn relative_locations_resolve_against_current() {
        let current = url("http://example.com/a/b?x=1");
        assert_eq!(
            resolve_location(&current, "c", false),
            Some(url("http://example.com/a/c"))
        );
        assert_eq!(
            resolve_location(&current, "/root?q=2", false),
            Some(url("http://example.com/root?q=2"))
        );
        assert_eq!(resolve_location(&current, "/root", true), None);
        assert_eq!(
            resolve_location(&current, "https://other.example/", true),
            Some(url("https://other.example/"))
        );
    }

    #[test]
    fn garbage_location_is_soft_failure() {
        let current = url("http://example.com/");
        assert_eq!(resolve_location(&current, "http://[::1", false), None);
    }

    #[test]
    fn loop_detection_ignores_query() {
        let a = url("http://example.com/a?n=1");
        let b = url("http://example.com/b");
        let mut tracker = RedirectTracker::new();
        tracker.follow(&a, &b, false, 100).expect("a -> b");
        let err = tracker
            .follow(&b, &url("http://example.com/a?n=2"), false, 100)
            .expect_err("b -> a is circular");
        assert!(err.is_redirect());
        assert_eq!(err.url().map(Url::as_str), Some("http://example.com/a"));

        let mut lenient = RedirectTracker::new();
        lenient.follow(&a, &b, true, 100).expect("a -> b");
        lenient.follow(&b, &a, true, 100).expect("loops allowed");
        assert_eq!(lenient.count(), 2);
    }

    #[test]
    fn budget_is_exhausted_on_the_last_hop() {
        let mut tracker = RedirectTracker::new();
        let a = url("http://example.com/1");
        let b = url("http://example.com/2");
        tracker.follow(&a, &b, true, 3).expect("hop 1");
        tracker.follow(&b, &a, true, 3).expect("hop 2");
        let err = tracker.follow(&a, &b, true, 3).expect_err("hop 3");
        assert_eq!(err.kind(), crate::error::Kind::MaxRedirects);
    }
}
