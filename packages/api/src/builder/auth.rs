//! Authentication
//!
//! Credentials go into the client's state for the request's host, where the
//! engine answers `401` challenges with them. Setting an `Authorization`
//! header directly bypasses the challenge handling.

use http::HeaderValue;
use tether_client::auth::Credentials;

use crate::builder::core::Tether;
use crate::builder::headers::header;

impl<S> Tether<S> {
    /// Answer authentication challenges with a username and password
    ///
    /// # Examples
    /// ```no_run
    /// use tether::Tether;
    ///
    /// let response = Tether::new()
    ///     .basic_auth("username", "password")
    ///     .get("http://api.example.com/protected");
    /// ```
    #[must_use]
    pub fn basic_auth(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials::username_password(username, password));
        self
    }

    /// Send the credentials with the first request instead of waiting for a challenge
    #[must_use]
    pub fn preemptive(mut self) -> Self {
        self.preemptive = true;
        self
    }

    /// Set a bearer token `Authorization` header
    #[must_use]
    pub fn bearer_auth(self, token: &str) -> Self {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(value) => self.header(header::AUTHORIZATION, value),
            Err(_) => {
                tracing::warn!("Skipping bearer token with invalid characters");
                self
            }
        }
    }
}
