//! Redirect handling
//!
//! The director follows 301, 302, 303, 307 and 308 responses that carry a
//! `Location`, for methods that allow it, until the hop budget runs out.

mod headers;
mod policy;

pub(crate) use headers::remove_sensitive_headers;
pub use policy::{RedirectTracker, is_redirect_status, resolve_location};
