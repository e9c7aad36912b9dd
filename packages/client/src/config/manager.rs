//! Connection and connection-manager parameters

use std::time::Duration;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::defaults;
use crate::connect::HostConfiguration;

/// Socket-level settings applied when a connection opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionParams {
    /// Timeout for establishing the TCP connection; `None` blocks until the OS gives up
    pub connection_timeout: Option<Duration>,
    /// Default socket read timeout; methods may override it per call
    pub socket_timeout: Option<Duration>,
    /// Enable `TCP_NODELAY`
    pub tcp_nodelay: bool,
    /// `SO_SNDBUF` hint
    pub send_buffer_size: Option<usize>,
    /// `SO_RCVBUF` hint
    pub receive_buffer_size: Option<usize>,
    /// `SO_LINGER`
    pub linger: Option<Duration>,
    /// Probe pooled connections for a silently closed peer before reuse
    pub stale_checking: bool,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            connection_timeout: None,
            socket_timeout: None,
            tcp_nodelay: true,
            send_buffer_size: None,
            receive_buffer_size: None,
            linger: None,
            stale_checking: true,
        }
    }
}

/// Pool sizing and maintenance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionManagerParams {
    /// Socket settings for every connection the manager creates
    #[serde(flatten)]
    pub connection: ConnectionParams,
    /// Connections allowed per host configuration unless overridden
    pub max_connections_per_host: usize,
    /// Per-host overrides of `max_connections_per_host`
    #[serde(skip)]
    pub max_host_connections: HashMap<HostConfiguration, usize>,
    /// Connections allowed across all hosts
    pub max_total_connections: usize,
    /// Close free connections idle for longer than this from the maintenance thread
    pub idle_timeout: Option<Duration>,
    /// Wake-up interval of the maintenance thread
    pub maintenance_interval: Duration,
    /// Reclaim pool capacity from checked-out connections idle for longer than this
    pub abandoned_grace: Option<Duration>,
}

impl Default for ConnectionManagerParams {
    fn default() -> Self {
        Self {
            connection: ConnectionParams::default(),
            max_connections_per_host: defaults::MAX_HOST_CONNECTIONS,
            max_host_connections: HashMap::new(),
            max_total_connections: defaults::MAX_TOTAL_CONNECTIONS,
            idle_timeout: None,
            maintenance_interval: defaults::MAINTENANCE_INTERVAL,
            abandoned_grace: None,
        }
    }
}

impl ConnectionManagerParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_connections_per_host(mut self, max: usize) -> Self {
        self.max_connections_per_host = max;
        self
    }

    /// Override the per-host cap for one host configuration.
    pub fn with_max_host_connections(mut self, host: HostConfiguration, max: usize) -> Self {
        self.max_host_connections.insert(host, max);
        self
    }

    pub fn with_max_total_connections(mut self, max: usize) -> Self {
        self.max_total_connections = max;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection.connection_timeout = Some(timeout);
        self
    }

    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.connection.socket_timeout = Some(timeout);
        self
    }

    pub fn with_stale_checking(mut self, enabled: bool) -> Self {
        self.connection.stale_checking = enabled;
        self
    }

    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = Some(idle);
        self
    }

    pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval;
        self
    }

    pub fn with_abandoned_grace(mut self, grace: Duration) -> Self {
        self.abandoned_grace = Some(grace);
        self
    }

    /// The connection cap that applies to `host`.
    #[must_use]
    pub fn max_connections_for(&self, host: &HostConfiguration) -> usize {
        self.max_host_connections
            .get(host)
            .copied()
            .unwrap_or(self.max_connections_per_host)
    }

    /// True when a background maintenance thread has work to do.
    #[must_use]
    pub fn needs_maintenance(&self) -> bool {
        self.idle_timeout.is_some() || self.abandoned_grace.is_some()
    }
}
