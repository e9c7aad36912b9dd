//! Authentication headers and challenge handling

use super::execute::MethodDirector;
use crate::auth::{
    AuthChallengeProcessor, AuthScheme, AuthScope, AuthState, Credentials, PROXY_AUTH_CHALLENGE,
    PROXY_AUTH_RESPONSE, WWW_AUTH_CHALLENGE, WWW_AUTH_RESPONSE, parse_challenges,
};
use crate::http::{Header, HeaderGroup};
use crate::method::HttpMethod;

/// Where credentials are sent: the origin server or the proxy.
#[derive(Debug, Clone)]
pub(super) struct AuthTarget {
    host: String,
    port: u16,
    proxy: bool,
}

impl AuthTarget {
    /// Scope for any realm and scheme on this host.
    pub(super) fn host_scope(&self) -> AuthScope {
        AuthScope::for_host(&self.host, self.port)
    }

    fn scope(&self, scheme: &dyn AuthScheme) -> AuthScope {
        AuthScope::new(
            Some(self.host.as_str()),
            Some(self.port),
            scheme.realm(),
            Some(scheme.scheme_name()),
        )
    }

    fn response_header(&self) -> &'static str {
        if self.proxy { PROXY_AUTH_RESPONSE } else { WWW_AUTH_RESPONSE }
    }
}

/// Drop engine-generated credentials headers. Returns false if the caller
/// supplied one of their own, which is then left alone.
fn clean_auth_headers(headers: &mut HeaderGroup, name: &str) -> bool {
    headers.remove_auto_generated(name);
    !headers.contains(name)
}

impl MethodDirector<'_> {
    pub(super) fn host_target(&self, method: &HttpMethod) -> Option<AuthTarget> {
        let conn = self.conn.as_deref()?;
        let host = method
            .resolved
            .virtual_host
            .clone()
            .unwrap_or_else(|| conn.host().to_string());
        Some(AuthTarget {
            host,
            port: conn.port(),
            proxy: false,
        })
    }

    pub(super) fn proxy_target(&self) -> Option<AuthTarget> {
        let conn = self.conn.as_deref()?;
        Some(AuthTarget {
            host: conn.proxy_host()?.to_string(),
            port: conn.proxy_port()?,
            proxy: true,
        })
    }

    fn stored_credentials(&self, target: &AuthTarget, scope: &AuthScope) -> Option<Credentials> {
        if target.proxy {
            self.state.proxy_credentials(scope)
        } else {
            self.state.credentials(scope)
        }
    }

    /// Add credentials headers for the coming attempt.
    pub(super) fn authenticate(&self, method: &mut HttpMethod) {
        let Some(conn) = self.conn.as_deref() else {
            return;
        };
        if conn.is_proxied() && !conn.is_secure() {
            self.authenticate_proxy(method);
        }
        if let Some(target) = self.host_target(method) {
            let verb = method.name().to_string();
            let uri = method.path_and_query();
            self.authenticate_with(
                &mut method.host_auth_state,
                &mut method.request_headers,
                &target,
                &verb,
                &uri,
            );
        }
    }

    pub(super) fn authenticate_proxy(&self, method: &mut HttpMethod) {
        if let Some(target) = self.proxy_target() {
            let verb = method.name().to_string();
            let uri = method.path_and_query();
            self.authenticate_with(
                &mut method.proxy_auth_state,
                &mut method.request_headers,
                &target,
                &verb,
                &uri,
            );
        }
    }

    fn authenticate_with(
        &self,
        auth_state: &mut AuthState,
        headers: &mut HeaderGroup,
        target: &AuthTarget,
        verb: &str,
        uri: &str,
    ) {
        let header = target.response_header();
        if !clean_auth_headers(headers, header) {
            return;
        }
        let requested = auth_state.is_auth_requested();
        let preemptive = auth_state.is_preemptive();
        let Some(scheme) = auth_state.scheme_mut() else {
            return;
        };
        if !requested && scheme.is_connection_based() {
            return;
        }

        let scope = target.scope(&**scheme);
        let Some(credentials) = self.stored_credentials(target, &scope) else {
            tracing::warn!("Required credentials not available for {}", scope);
            if preemptive {
                tracing::warn!("Preemptive authentication requested but no default credentials available");
            }
            return;
        };
        match scheme.authenticate(&credentials, verb, uri) {
            Ok(value) => headers.add(Header::auto(header, value)),
            Err(e) => tracing::error!("Authentication with {} failed: {}", scope, e),
        }
    }

    /// Whether the response is a challenge the director should answer.
    pub(super) fn is_authentication_needed(&self, method: &mut HttpMethod) -> bool {
        let status = method.status_code();
        method.host_auth_state.set_auth_requested(status == 401);
        method.proxy_auth_state.set_auth_requested(status == 407);
        if status == 401 || status == 407 {
            tracing::debug!("Authorization required");
            method.do_authentication()
        } else {
            false
        }
    }

    /// Prepare the next attempt's credentials. Returns false when the
    /// challenge cannot be answered and the response goes to the caller.
    pub(super) fn process_authentication_response(&self, method: &mut HttpMethod) -> bool {
        let target = match method.status_code() {
            401 => self.host_target(method),
            407 => self.proxy_target(),
            _ => None,
        };
        let Some(target) = target else {
            return false;
        };

        let challenge_header = if target.proxy { PROXY_AUTH_CHALLENGE } else { WWW_AUTH_CHALLENGE };
        let challenges = parse_challenges(method.response_headers.all(challenge_header));
        if challenges.is_empty() {
            tracing::debug!("Authentication challenge(s) not found");
            return false;
        }
        let processor = AuthChallengeProcessor::new(method.resolved.auth_scheme_priority.as_deref());
        let provider = method.resolved.credentials_provider.clone();
        let auth_state = if target.proxy {
            &mut method.proxy_auth_state
        } else {
            &mut method.host_auth_state
        };

        if let Err(e) = processor.process_challenge(auth_state, &challenges) {
            tracing::warn!("{}", e);
            return false;
        }
        let Some(scheme) = auth_state.scheme() else {
            return false;
        };
        let scope = target.scope(scheme);
        let already_failed = auth_state.is_auth_attempted() && scheme.is_complete();

        let prompt = |scheme: &dyn AuthScheme| -> Option<Credentials> {
            let Some(provider) = provider.as_ref() else {
                tracing::debug!("Credentials provider not available");
                return None;
            };
            let credentials = provider.get_credentials(scheme, &target.host, target.port, target.proxy)?;
            if target.proxy {
                self.state.set_proxy_credentials(scope.clone(), credentials.clone());
            } else {
                self.state.set_credentials(scope.clone(), credentials.clone());
            }
            tracing::debug!("Credentials obtained for {}", scope);
            Some(credentials)
        };

        if already_failed {
            // The credentials just sent were rejected; only different ones are worth a retry.
            let rejected = self.stored_credentials(&target, &scope);
            return match prompt(scheme) {
                Some(credentials) if Some(&credentials) != rejected.as_ref() => true,
                _ => {
                    tracing::info!("Failure authenticating with {}", scope);
                    false
                }
            };
        }

        let stored = self.stored_credentials(&target, &scope);
        let found = stored.is_some() || prompt(scheme).is_some();
        auth_state.set_auth_attempted(true);
        if !found {
            tracing::info!("No credentials available for {}", scope);
        }
        found
    }
}
