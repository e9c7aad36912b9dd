//! Interactive credential lookup

use std::fmt;

use super::credentials::Credentials;
use super::scheme::AuthScheme;

/// Supplies credentials when none are stored for a challenged scope.
///
/// Returning `None` leaves the challenge unanswered and the 401/407
/// response goes back to the caller.
pub trait CredentialsProvider: Send + Sync + fmt::Debug {
    fn get_credentials(
        &self,
        scheme: &dyn AuthScheme,
        host: &str,
        port: u16,
        proxy: bool,
    ) -> Option<Credentials>;
}

/// A provider that answers every prompt with the same credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentialsProvider {
    credentials: Credentials,
}

impl StaticCredentialsProvider {
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl CredentialsProvider for StaticCredentialsProvider {
    fn get_credentials(
        &self,
        _scheme: &dyn AuthScheme,
        _host: &str,
        _port: u16,
        _proxy: bool,
    ) -> Option<Credentials> {
        Some(self.credentials.clone())
    }
}
