//! The execute/authenticate/redirect/retry loop

use std::thread;

use url::Url;

use super::response::TunnelResult;
use crate::auth::{AuthScope, CredentialsKind};
use crate::client::ClientStats;
use crate::config::ClientParams;
use crate::connect::HostConfiguration;
use crate::error::{self, Result};
use crate::http::Header;
use crate::method::HttpMethod;
use crate::pool::{HttpConnectionManager, PooledConnection};
use crate::redirect::{RedirectTracker, is_redirect_status, remove_sensitive_headers, resolve_location};
use crate::state::HttpState;

/// Executes one method to completion. Built per call.
pub(crate) struct MethodDirector<'a> {
    pub(super) manager: &'a dyn HttpConnectionManager,
    pub(super) config: HostConfiguration,
    pub(super) params: &'a ClientParams,
    pub(super) state: &'a HttpState,
    pub(super) stats: &'a ClientStats,
    pub(super) conn: Option<PooledConnection>,
    redirects: RedirectTracker,
}

impl<'a> MethodDirector<'a> {
    pub(crate) fn new(
        manager: &'a dyn HttpConnectionManager,
        config: HostConfiguration,
        params: &'a ClientParams,
        state: &'a HttpState,
        stats: &'a ClientStats,
    ) -> Self {
        Self {
            manager,
            config,
            params,
            state,
            stats,
            conn: None,
            redirects: RedirectTracker::new(),
        }
    }

    /// Run `method` until it has a final response. On success the method
    /// keeps the connection while its body is unread; on failure the
    /// connection is closed.
    pub(crate) fn execute_method(mut self, method: &mut HttpMethod) -> Result<u16> {
        method.bind_defaults([&self.config.params().method, &self.params.method]);
        for (name, value) in &self.config.params().default_headers {
            if !method.request_headers.contains(name) {
                method.request_headers.add(Header::new(name.as_str(), value.as_str()));
            }
        }

        match self.run(method) {
            Ok(status) => {
                if let Some(conn) = self.conn.take() {
                    method.attach_connection(conn);
                }
                Ok(status)
            }
            Err(e) => {
                if let Some(mut conn) = self.conn.take() {
                    tracing::debug!("Closing the connection after error: {}", e);
                    conn.close();
                }
                method.abandon_response();
                Err(e)
            }
        }
    }

    fn run(&mut self, method: &mut HttpMethod) -> Result<u16> {
        loop {
            if self
                .conn
                .as_ref()
                .is_some_and(|conn| conn.host_configuration() != &self.config)
            {
                tracing::debug!("Host configuration changed; releasing connection");
                self.conn = None;
            }
            if self.conn.is_none() {
                let conn = self
                    .manager
                    .get_connection(&self.config, self.params.connection_manager_timeout)?;
                self.conn = Some(conn);
                self.apply_preemptive(method);
            }

            self.authenticate(method);
            self.execute_with_retry(method)?;

            let mut retry = false;
            if self.is_redirect_needed(method) && self.process_redirect_response(method)? {
                self.stats.record_redirect();
                retry = true;
            }
            if self.is_authentication_needed(method) && self.process_authentication_response(method) {
                self.stats.record_auth_challenge();
                retry = true;
            }
            if !retry {
                break;
            }
            if let Some(conn) = self.conn.as_deref_mut() {
                method.discard_response_body(conn)?;
            }
        }
        Ok(method.status_code())
    }

    /// Whether stored credentials may be sent before any challenge.
    pub(super) fn permits_preemptive(&self, kind: CredentialsKind) -> bool {
        if self.params.is_authentication_preemptive() {
            self.params.permits_preemptive(kind)
        } else {
            self.state.is_authentication_preemptive() && kind == CredentialsKind::UsernamePassword
        }
    }

    fn apply_preemptive(&self, method: &mut HttpMethod) {
        if !self.params.is_authentication_preemptive() && !self.state.is_authentication_preemptive() {
            return;
        }
        let Some(conn) = self.conn.as_deref() else {
            return;
        };

        let host = method
            .resolved
            .virtual_host
            .clone()
            .unwrap_or_else(|| conn.host().to_string());
        let scope = AuthScope::for_host(&host, conn.port());
        match self.state.credentials(&scope) {
            Some(credentials) if self.permits_preemptive(credentials.kind()) => {
                tracing::debug!("Preemptively sending default basic credentials");
                method.host_auth_state.set_preemptive();
                method.host_auth_state.set_auth_attempted(true);
            }
            Some(credentials) => tracing::debug!(
                "Credentials of kind {:?} for {} are not permitted preemptively",
                credentials.kind(),
                scope
            ),
            None => tracing::warn!("Preemptive authentication requested but no default credentials available"),
        }

        if conn.is_proxied() && !conn.is_secure() && self.proxy_preemptive_permitted() {
            method.proxy_auth_state.set_preemptive();
            method.proxy_auth_state.set_auth_attempted(true);
        }
    }

    fn execute_with_retry(&mut self, method: &mut HttpMethod) -> Result<()> {
        let handler = method.resolved.retry_handler();
        let mut execution_count = 0u32;
        loop {
            execution_count += 1;
            match self.try_execute(method) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if let Some(conn) = self.conn.as_deref_mut() {
                        tracing::debug!("Closing the connection.");
                        conn.close();
                    }
                    if !e.is_transport() {
                        return Err(e);
                    }
                    if !handler.retry_method(method, &e, execution_count) {
                        tracing::debug!(
                            "Method retry handler returned false. Automatic recovery will not be attempted"
                        );
                        return Err(e);
                    }
                    tracing::info!("I/O error caught when processing request: {}", e);
                    tracing::info!("Retrying request");
                    self.stats.record_retry();
                    let pause = handler.backoff(execution_count);
                    if !pause.is_zero() {
                        thread::sleep(pause);
                    }
                }
            }
        }
    }

    /// One attempt: revive the connection, tunnel if needed, execute.
    fn try_execute(&mut self, method: &mut HttpMethod) -> Result<()> {
        let conn = self
            .conn
            .as_deref_mut()
            .ok_or_else(|| error::usage("no connection checked out"))?;
        if conn.params().stale_checking {
            conn.close_if_stale();
        }
        if !conn.is_open() {
            conn.open().map_err(error::io)?;
            if conn.is_proxied() && conn.is_secure() {
                self.stats.record_tunnel();
                if let TunnelResult::Failed(response) = self.establish_tunnel()? {
                    return Err(error::tunnel_refused(response));
                }
            }
        }
        let conn = self
            .conn
            .as_deref_mut()
            .ok_or_else(|| error::usage("no connection checked out"))?;
        method.execute(self.state, conn)?;
        Ok(())
    }

    fn is_redirect_needed(&self, method: &HttpMethod) -> bool {
        if !is_redirect_status(method.status_code()) {
            return false;
        }
        tracing::debug!("Redirect required");
        method.follow_redirects()
    }

    /// Retarget the method at the `Location` of a redirect. Returns false
    /// when there is nothing usable to follow.
    fn process_redirect_response(&mut self, method: &mut HttpMethod) -> Result<bool> {
        let Some(location) = method.response_header("Location").map(|h| h.value().to_string()) else {
            tracing::error!(
                "Received redirect response {} but no location header",
                method.status_code()
            );
            return Ok(false);
        };
        tracing::debug!("Redirect requested to location '{}'", location);

        let Some(current) = self.current_url(method) else {
            return Ok(false);
        };
        let reject_relative = method.resolved.is_reject_relative_redirect();
        let Some(next) = resolve_location(&current, &location, reject_relative) else {
            return Ok(false);
        };

        self.redirects.follow(
            &current,
            &next,
            method.resolved.is_allow_circular_redirects(),
            method.resolved.max_redirects(),
        )?;

        method
            .set_uri(&next)
            .map_err(|e| error::redirect(e).with_url(next.clone()))?;
        self.config
            .set_host_url(&next)
            .map_err(|e| error::redirect(e).with_url(next.clone()))?;
        remove_sensitive_headers(&mut method.request_headers, &next, &current);
        method.host_auth_state.invalidate();

        tracing::debug!("Redirecting from '{}' to '{}'", current, next);
        Ok(true)
    }

    /// `scheme://host:port/path` of the request just made.
    fn current_url(&self, method: &HttpMethod) -> Option<Url> {
        let conn = self.conn.as_deref()?;
        let scheme = conn.protocol()?.scheme().to_ascii_lowercase();
        let raw = format!("{}://{}:{}{}", scheme, conn.host(), conn.port(), method.path());
        match Url::parse(&raw) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Unable to build current URI '{}': {}", raw, e);
                None
            }
        }
    }
}
