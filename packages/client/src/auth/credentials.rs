//! Credentials handed to authentication schemes

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a [`Credentials`] value, used to restrict preemptive authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialsKind {
    UsernamePassword,
    Nt,
}

/// A secret presented to a server or proxy.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    UsernamePassword {
        username: String,
        password: Option<String>,
    },
    /// Windows domain credentials. Carries everything a username/password
    /// scheme needs, so Basic accepts it as well.
    Nt {
        username: String,
        password: Option<String>,
        host: String,
        domain: String,
    },
}

impl Credentials {
    pub fn username_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::UsernamePassword {
            username: username.into(),
            password: Some(password.into()),
        }
    }

    pub fn username_only(username: impl Into<String>) -> Self {
        Credentials::UsernamePassword {
            username: username.into(),
            password: None,
        }
    }

    pub fn nt(
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Credentials::Nt {
            username: username.into(),
            password: Some(password.into()),
            host: host.into(),
            domain: domain.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> CredentialsKind {
        match self {
            Credentials::UsernamePassword { .. } => CredentialsKind::UsernamePassword,
            Credentials::Nt { .. } => CredentialsKind::Nt,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            Credentials::UsernamePassword { username, .. } | Credentials::Nt { username, .. } => {
                username
            }
        }
    }

    #[must_use]
    pub fn password(&self) -> Option<&str> {
        match self {
            Credentials::UsernamePassword { password, .. } | Credentials::Nt { password, .. } => {
                password.as_deref()
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Nt {
                username,
                host,
                domain,
                ..
            } => f
                .debug_struct("Nt")
                .field("username", username)
                .field("password", &"<redacted>")
                .field("host", host)
                .field("domain", domain)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_password() {
        let creds = Credentials::username_password("alice", "s3cret");
        let printed = format!("{creds:?}");
        assert!(printed.contains("alice"));
        assert!(!printed.contains("s3cret"));
    }

    #[test]
    fn kind_names_serialize_in_snake_case() {
        let json = serde_json::to_string(&CredentialsKind::UsernamePassword).expect("serialize");
        assert_eq!(json, "\"username_password\"");
    }
}
