//! The authentication scheme capability

use std::fmt;

use super::challenge::AuthChallenge;
use super::credentials::Credentials;

/// Failures while answering a challenge. None of these abort a request:
/// the director logs them and hands the challenge response back.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("malformed {scheme} challenge: {reason}")]
    MalformedChallenge { scheme: String, reason: String },
    #[error("{0} authorization challenge expected, but not found")]
    ChallengeMissing(String),
    #[error("unable to respond to any of these challenges: {0}")]
    NoSupportedScheme(String),
}

/// One authentication strategy, instantiated per challenge exchange.
pub trait AuthScheme: Send + Sync + fmt::Debug {
    /// Lowercase scheme token, as it appears in challenges.
    fn scheme_name(&self) -> &str;

    /// Absorb the server's challenge for this scheme.
    fn process_challenge(&mut self, challenge: &AuthChallenge) -> Result<(), AuthError>;

    /// An auth-param from the processed challenge.
    fn parameter(&self, name: &str) -> Option<&str>;

    fn realm(&self) -> Option<&str> {
        self.parameter("realm")
    }

    /// True if the scheme authorizes a connection rather than each request.
    fn is_connection_based(&self) -> bool;

    /// True once the exchange has gathered everything it needs; a challenge
    /// arriving after that means the credentials were rejected.
    fn is_complete(&self) -> bool;

    /// Produce the `Authorization`/`Proxy-Authorization` header value.
    fn authenticate(
        &mut self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
    ) -> Result<String, AuthError>;
}
