//! The client facade
//!
//! Holds the default state, the default host configuration and the
//! connection manager, and builds one director per `execute_method` call.

use std::sync::Arc;

use crate::config::ClientParams;
use crate::connect::HostConfiguration;
use crate::director::MethodDirector;
use crate::error::{self, Result};
use crate::method::HttpMethod;
use crate::pool::{HttpConnectionManager, MultiThreadedConnectionManager};
use crate::state::HttpState;

use super::stats::ClientStats;

/// Entry point for executing methods.
///
/// Clones share the connection manager, the state and the statistics.
#[derive(Debug, Clone)]
pub struct HttpClient {
    state: Arc<HttpState>,
    host_config: HostConfiguration,
    manager: Arc<dyn HttpConnectionManager>,
    params: ClientParams,
    stats: Arc<ClientStats>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// A client with a pooling connection manager and default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::with_manager(Arc::new(MultiThreadedConnectionManager::new()))
    }

    #[must_use]
    pub fn with_manager(manager: Arc<dyn HttpConnectionManager>) -> Self {
        Self {
            state: Arc::new(HttpState::new()),
            host_config: HostConfiguration::new(),
            manager,
            params: ClientParams::default(),
            stats: Arc::new(ClientStats::new()),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: ClientParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_host_configuration(mut self, config: HostConfiguration) -> Self {
        self.host_config = config;
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: Arc<HttpState>) -> Self {
        self.state = state;
        self
    }

    /// Execute `method` against the client's host configuration and state.
    ///
    /// Returns the final status code. The response body stays readable on
    /// the method; its connection goes back to the pool once the body is
    /// consumed or the method is released or dropped.
    pub fn execute_method(&self, method: &mut HttpMethod) -> Result<u16> {
        self.execute_method_with(None, method, None)
    }

    /// Execute `method`, overriding the host configuration and the state.
    ///
    /// An absolute URI on the method retargets a clone of the host
    /// configuration; the configuration passed in is never changed.
    pub fn execute_method_with(
        &self,
        config: Option<&HostConfiguration>,
        method: &mut HttpMethod,
        state: Option<&HttpState>,
    ) -> Result<u16> {
        if method.is_aborted() {
            return Err(error::usage("method has been aborted"));
        }
        if method.is_used() {
            return Err(error::usage("method has already been executed; recycle it first"));
        }

        let mut host_config = config.unwrap_or(&self.host_config).clone();
        if let Some(uri) = method.uri() {
            host_config.set_host_url(&uri)?;
        }
        if host_config.host().is_none() {
            return Err(error::builder("no target host: use an absolute URI or set a host configuration"));
        }
        let state = state.unwrap_or(&self.state);

        self.stats.record_request();
        tracing::debug!("Executing {} {} via {}", method.name(), method.path(), host_config);
        let director = MethodDirector::new(self.manager.as_ref(), host_config, &self.params, state, &self.stats);
        match director.execute_method(method) {
            Ok(status) => {
                if status < 400 {
                    self.stats.record_success();
                } else {
                    self.stats.record_failure();
                }
                Ok(status)
            }
            Err(e) => {
                self.stats.record_failure();
                Err(e)
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &Arc<HttpState> {
        &self.state
    }

    pub fn set_state(&mut self, state: Arc<HttpState>) {
        self.state = state;
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> &ClientParams {
        &self.params
    }

    #[inline]
    pub fn params_mut(&mut self) -> &mut ClientParams {
        &mut self.params
    }

    #[inline]
    #[must_use]
    pub fn host_configuration(&self) -> &HostConfiguration {
        &self.host_config
    }

    pub fn set_host_configuration(&mut self, config: HostConfiguration) {
        self.host_config = config;
    }

    #[inline]
    #[must_use]
    pub fn connection_manager(&self) -> &Arc<dyn HttpConnectionManager> {
        &self.manager
    }

    pub fn set_connection_manager(&mut self, manager: Arc<dyn HttpConnectionManager>) {
        self.manager = manager;
    }

    /// Statistics shared by every clone of this client.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> Arc<ClientStats> {
        Arc::clone(&self.stats)
    }
}
