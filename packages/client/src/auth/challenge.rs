//! Challenge parsing and scheme selection

use std::fmt;

use hashbrown::HashMap;

use super::policy::AuthPolicy;
use super::scheme::{AuthError, AuthScheme};
use super::state::AuthState;
use crate::http::headers::{parse_pair, split_unquoted};
use crate::http::{Header, NameValuePair};

/// One parsed `WWW-Authenticate` or `Proxy-Authenticate` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    scheme: String,
    raw: String,
    params: Vec<NameValuePair>,
}

impl AuthChallenge {
    /// Split a challenge into its scheme token and auth-params.
    pub fn parse(value: &str) -> Result<Self, AuthError> {
        let raw = value.trim();
        let (scheme, rest) = match raw.split_once(char::is_whitespace) {
            Some((scheme, rest)) => (scheme, rest.trim()),
            None => (raw, ""),
        };
        if scheme.is_empty() {
            return Err(AuthError::MalformedChallenge {
                scheme: String::new(),
                reason: "missing authentication scheme".to_string(),
            });
        }
        let params = if rest.is_empty() {
            Vec::new()
        } else {
            split_unquoted(rest, ',')
                .into_iter()
                .filter_map(parse_pair)
                .collect()
        };
        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            raw: raw.to_string(),
            params,
        })
    }

    /// Lowercased scheme token.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn params(&self) -> &[NameValuePair] {
        &self.params
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .and_then(|p| p.value.as_deref())
    }
}

impl fmt::Display for AuthChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Challenges from a response, keyed by lowercase scheme name.
/// Unparseable values are skipped; the first challenge for a scheme wins.
pub fn parse_challenges<'a, I>(headers: I) -> HashMap<String, AuthChallenge>
where
    I: IntoIterator<Item = &'a Header>,
{
    let mut challenges = HashMap::new();
    for header in headers {
        match AuthChallenge::parse(header.value()) {
            Ok(challenge) => {
                challenges
                    .entry(challenge.scheme.clone())
                    .or_insert(challenge);
            }
            Err(e) => tracing::warn!("Ignoring authentication challenge: {}", e),
        }
    }
    challenges
}

/// Chooses and drives the scheme that answers a set of challenges.
#[derive(Debug, Clone)]
pub struct AuthChallengeProcessor {
    priority: Vec<String>,
}

impl AuthChallengeProcessor {
    /// `priority` overrides the policy's default preference order when non-empty.
    #[must_use]
    pub fn new(priority: Option<&[String]>) -> Self {
        let priority = match priority {
            Some(list) if !list.is_empty() => list.iter().map(|s| s.to_ascii_lowercase()).collect(),
            _ => AuthPolicy::default_priority(),
        };
        Self { priority }
    }

    /// Instantiate the most preferred scheme that has a challenge.
    pub fn select_scheme(
        &self,
        challenges: &HashMap<String, AuthChallenge>,
    ) -> Result<Box<dyn AuthScheme>, AuthError> {
        for id in &self.priority {
            if challenges.contains_key(id) {
                tracing::debug!("{} authentication scheme selected", id);
                if let Some(scheme) = AuthPolicy::create(id) {
                    return Ok(scheme);
                }
                tracing::warn!("Authentication scheme {} is not registered", id);
            } else {
                tracing::debug!("Challenge for {} authentication scheme not available", id);
            }
        }
        let offered: Vec<&str> = challenges.values().map(AuthChallenge::raw).collect();
        Err(AuthError::NoSupportedScheme(offered.join(", ")))
    }

    /// Feed `challenges` to the scheme held by `state`, selecting one first
    /// if the state has none yet. A preemptive state is reset, since the
    /// server rejected or ignored what was sent ahead of the challenge.
    pub fn process_challenge<'s>(
        &self,
        state: &'s mut AuthState,
        challenges: &HashMap<String, AuthChallenge>,
    ) -> Result<&'s dyn AuthScheme, AuthError> {
        if state.is_preemptive() {
            state.invalidate();
            state.set_auth_requested(true);
        }
        if state.scheme().is_none() {
            state.set_scheme(Some(self.select_scheme(challenges)?));
        }
        let scheme = state
            .scheme_mut()
            .ok_or_else(|| AuthError::NoSupportedScheme(String::new()))?;
        let id = scheme.scheme_name().to_ascii_lowercase();
        let challenge = challenges
            .get(&id)
            .ok_or_else(|| AuthError::ChallengeMissing(id.clone()))?;
        scheme.process_challenge(challenge)?;
        tracing::debug!("Authorization challenge processed");
        Ok(&**scheme)
    }
}

impl Default for AuthChallengeProcessor {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_and_quoted_params() {
        let challenge =
            AuthChallenge::parse(r#"Basic realm="Secure Area, Inc", charset="UTF-8""#)
                .expect("challenge");
        assert_eq!(challenge.scheme(), "basic");
        assert_eq!(challenge.param("realm"), Some("Secure Area, Inc"));
        assert_eq!(challenge.param("CHARSET"), Some("UTF-8"));
    }

    #[test]
    fn bare_scheme_has_no_params() {
        let challenge = AuthChallenge::parse("Negotiate").expect("challenge");
        assert_eq!(challenge.scheme(), "negotiate");
        assert!(challenge.params().is_empty());
        assert!(AuthChallenge::parse("   ").is_err());
    }

    #[test]
    fn challenges_are_keyed_by_lowercase_scheme() {
        let headers = [
            Header::new("WWW-Authenticate", "Digest realm=\"x\", nonce=\"abc\""),
            Header::new("WWW-Authenticate", "BASIC realm=\"x\""),
            Header::new("WWW-Authenticate", "Basic realm=\"y\""),
        ];
        let map = parse_challenges(&headers);
        assert_eq!(map.len(), 2);
        assert_eq!(map["basic"].param("realm"), Some("x"));
        assert!(map.contains_key("digest"));
    }

    #[test]
    fn processor_picks_basic_and_reports_unsupported() {
        let processor = AuthChallengeProcessor::default();
        let supported = parse_challenges(&[Header::new("WWW-Authenticate", "Basic realm=\"r\"")]);
        let mut state = AuthState::new();
        let scheme = processor
            .process_challenge(&mut state, &supported)
            .expect("basic is supported");
        assert_eq!(scheme.scheme_name(), "basic");
        assert_eq!(scheme.realm(), Some("r"));
        assert!(scheme.is_complete());

        let unsupported = parse_challenges(&[Header::new("WWW-Authenticate", "Bearer realm=\"r\"")]);
        let mut state = AuthState::new();
        assert!(matches!(
            processor.process_challenge(&mut state, &unsupported),
            Err(AuthError::NoSupportedScheme(_))
        ));
    }
}
