//! HTTP cookie management
//!
//! Cookies are parsed from `Set-Cookie` headers by the [`CookieSpec`] a
//! [`CookiePolicy`] selects, stored in [`HttpState`](crate::state::HttpState)
//! and matched back onto later requests.

pub mod core;
pub mod spec;
pub mod utils;

pub use self::core::{Cookie, CookiePolicy};

pub use spec::{BrowserCompatSpec, CookieOrigin, CookieSpec, IgnoreCookiesSpec, MalformedCookie};
pub use utils::*;
