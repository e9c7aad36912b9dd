//! CONNECT tunnel through a proxy

use super::execute::MethodDirector;
use super::response::{ProxyResponse, TunnelResult};
use crate::error::{self, Result};
use crate::http::StatusLine;
use crate::method::HttpMethod;

impl MethodDirector<'_> {
    /// Stored proxy credentials exist and may be sent unasked.
    pub(super) fn proxy_preemptive_permitted(&self) -> bool {
        let Some(target) = self.proxy_target() else {
            return false;
        };
        self.state
            .proxy_credentials(&target.host_scope())
            .is_some_and(|credentials| self.permits_preemptive(credentials.kind()))
    }

    /// Ask the proxy for a tunnel to the target host, answering proxy
    /// challenges at most `max_tunnel_auth_attempts` times.
    pub(super) fn establish_tunnel(&mut self) -> Result<TunnelResult> {
        let mut connect = HttpMethod::connect(&self.config);
        connect.bind_defaults([&self.config.params().method, &self.params.method]);
        let max_attempts = self.params.max_tunnel_auth_attempts();
        let mut auth_attempts = 0u32;
        if self.proxy_preemptive_permitted() {
            tracing::debug!("Preemptively sending default basic credentials");
            connect.proxy_auth_state.set_preemptive();
            connect.proxy_auth_state.set_auth_attempted(true);
        }

        let status = loop {
            let conn = self
                .conn
                .as_deref_mut()
                .ok_or_else(|| error::usage("no connection checked out"))?;
            if !conn.is_open() {
                conn.open().map_err(error::io)?;
            }
            self.authenticate_proxy(&mut connect);

            let conn = self
                .conn
                .as_deref_mut()
                .ok_or_else(|| error::usage("no connection checked out"))?;
            let status = connect.execute(self.state, conn)?;

            connect.proxy_auth_state.set_auth_requested(status == 407);
            if status != 407 || !connect.do_authentication() {
                break status;
            }
            if auth_attempts >= max_attempts {
                tracing::warn!(
                    "Giving up on proxy authentication after {} attempts",
                    auth_attempts
                );
                break status;
            }
            if !self.process_authentication_response(&mut connect) {
                break status;
            }
            auth_attempts += 1;
            self.stats.record_auth_challenge();

            let conn = self
                .conn
                .as_deref_mut()
                .ok_or_else(|| error::usage("no connection checked out"))?;
            connect.discard_response_body(conn)?;
        };

        let conn = self
            .conn
            .as_deref_mut()
            .ok_or_else(|| error::usage("no connection checked out"))?;
        if (200..300).contains(&status) {
            conn.tunnel_created().map_err(error::wire)?;
            return Ok(TunnelResult::Established);
        }

        tracing::debug!("CONNECT refused by proxy with status {}", status);
        let body = connect.read_body_to_end(conn)?;
        conn.close();
        let status_line = connect
            .status_line()
            .cloned()
            .unwrap_or_else(|| StatusLine::synthetic(connect.effective_version(), status, ""));
        Ok(TunnelResult::Failed(ProxyResponse::new(
            status_line,
            connect.response_headers().clone(),
            body,
        )))
    }
}
