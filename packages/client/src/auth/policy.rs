//! Process-wide registry of authentication schemes
//!
//! Registration order is the default preference order used when a response
//! offers more than one challenge.

use std::sync::{OnceLock, PoisonError, RwLock};

use super::basic_auth::{self, BasicScheme};
use super::scheme::AuthScheme;

type SchemeFactory = fn() -> Box<dyn AuthScheme>;

static REGISTRY: OnceLock<RwLock<Vec<(String, SchemeFactory)>>> = OnceLock::new();

fn registry() -> &'static RwLock<Vec<(String, SchemeFactory)>> {
    REGISTRY.get_or_init(|| {
        let basic: SchemeFactory = || Box::new(BasicScheme::new());
        RwLock::new(vec![(basic_auth::SCHEME_NAME.to_string(), basic)])
    })
}

/// Registry facade; not constructible.
pub struct AuthPolicy;

impl AuthPolicy {
    /// Register a scheme at the end of the preference order, replacing any
    /// earlier registration under the same id.
    pub fn register(id: &str, factory: SchemeFactory) {
        let id = id.to_ascii_lowercase();
        let mut schemes = registry().write().unwrap_or_else(PoisonError::into_inner);
        schemes.retain(|(existing, _)| *existing != id);
        tracing::debug!("Registered authentication scheme {}", id);
        schemes.push((id, factory));
    }

    pub fn unregister(id: &str) {
        let id = id.to_ascii_lowercase();
        registry()
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }

    /// A fresh instance of the scheme registered under `id`.
    #[must_use]
    pub fn create(id: &str) -> Option<Box<dyn AuthScheme>> {
        registry()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(id))
            .map(|(_, factory)| factory())
    }

    /// Registered scheme ids, most preferred first.
    #[must_use]
    pub fn default_priority() -> Vec<String> {
        registry()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}
