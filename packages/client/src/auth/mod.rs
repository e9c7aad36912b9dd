//! Authentication
//!
//! Challenges from `WWW-Authenticate`/`Proxy-Authenticate` are parsed into a
//! scheme-keyed map, a scheme is chosen by preference order, and credentials
//! are found in [`HttpState`](crate::state::HttpState) by best-matching
//! [`AuthScope`] or obtained from a [`CredentialsProvider`].

pub mod basic_auth;
pub mod challenge;
pub mod credentials;
pub mod policy;
pub mod provider;
pub mod scheme;
pub mod scope;
pub mod state;

pub use basic_auth::{BasicScheme, basic_auth, decode_basic_auth};
pub use challenge::{AuthChallenge, AuthChallengeProcessor, parse_challenges};
pub use credentials::{Credentials, CredentialsKind};
pub use policy::AuthPolicy;
pub use provider::{CredentialsProvider, StaticCredentialsProvider};
pub use scheme::{AuthError, AuthScheme};
pub use scope::AuthScope;
pub use state::AuthState;

/// Request header carrying credentials for the origin server.
pub const WWW_AUTH_RESPONSE: &str = "Authorization";
/// Request header carrying credentials for a proxy.
pub const PROXY_AUTH_RESPONSE: &str = "Proxy-Authorization";
/// Response header challenging for origin credentials.
pub const WWW_AUTH_CHALLENGE: &str = "WWW-Authenticate";
/// Response header challenging for proxy credentials.
pub const PROXY_AUTH_CHALLENGE: &str = "Proxy-Authenticate";
