//! Basic authentication

use std::io::Write;

use base64::prelude::BASE64_STANDARD;
use base64::{Engine, write::EncoderWriter};

use super::challenge::AuthChallenge;
use super::credentials::Credentials;
use super::scheme::{AuthError, AuthScheme};

pub const SCHEME_NAME: &str = "basic";

/// `Basic <base64(username:password)>` for the given credentials.
#[must_use]
pub fn basic_auth(username: &str, password: Option<&str>) -> String {
    let mut buf = b"Basic ".to_vec();
    {
        let mut encoder = EncoderWriter::new(&mut buf, &BASE64_STANDARD);
        let _ = write!(encoder, "{username}:");
        if let Some(password) = password {
            let _ = write!(encoder, "{password}");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Decode the token of a `Basic` authorization value into username and password.
#[must_use]
pub fn decode_basic_auth(value: &str) -> Option<(String, String)> {
    let encoded = value
        .trim()
        .strip_prefix("Basic ")
        .unwrap_or(value)
        .trim();
    let decoded = BASE64_STANDARD.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (username, password) = credentials.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// The Basic scheme. Stateless apart from the challenge's realm.
#[derive(Debug, Clone, Default)]
pub struct BasicScheme {
    realm: Option<String>,
    complete: bool,
}

impl BasicScheme {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuthScheme for BasicScheme {
    fn scheme_name(&self) -> &str {
        SCHEME_NAME
    }

    fn process_challenge(&mut self, challenge: &AuthChallenge) -> Result<(), AuthError> {
        if challenge.scheme() != SCHEME_NAME {
            return Err(AuthError::MalformedChallenge {
                scheme: SCHEME_NAME.to_string(),
                reason: format!("invalid challenge: {challenge}"),
            });
        }
        self.realm = challenge.param("realm").map(str::to_string);
        self.complete = true;
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<&str> {
        if name.eq_ignore_ascii_case("realm") {
            self.realm.as_deref()
        } else {
            None
        }
    }

    fn is_connection_based(&self) -> bool {
        false
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn authenticate(
        &mut self,
        credentials: &Credentials,
        _method: &str,
        _uri: &str,
    ) -> Result<String, AuthError> {
        Ok(basic_auth(credentials.username(), credentials.password()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_rfc_example() {
        assert_eq!(
            basic_auth("Aladdin", Some("open sesame")),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn decode_reverses_encoding() {
        let header = basic_auth("user", Some("p:ss"));
        assert_eq!(
            decode_basic_auth(&header),
            Some(("user".to_string(), "p:ss".to_string()))
        );
        assert_eq!(decode_basic_auth("Basic !!!"), None);
    }

    #[test]
    fn nt_credentials_are_accepted() {
        let mut scheme = BasicScheme::new();
        let creds = Credentials::nt("bob", "pw", "workstation", "CORP");
        let value = scheme.authenticate(&creds, "GET", "/").expect("basic accepts nt");
        assert_eq!(value, basic_auth("bob", Some("pw")));
        assert!(!scheme.is_complete());
    }
}
