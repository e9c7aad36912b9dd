//! Single-connection manager
//!
//! Holds at most one connection, reopened for whatever host configuration is
//! asked for next. Meant for single-threaded use: a second checkout while the
//! connection is out is an error rather than a wait.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::{ConnectionRelease, HttpConnectionManager, PooledConnection};
use crate::config::ConnectionManagerParams;
use crate::connect::{HostConfiguration, HttpConnection};
use crate::error::{self, ConnectionShutdown, Result};

#[derive(Debug)]
struct Slot {
    conn: Option<HttpConnection>,
    in_use: bool,
    released_at: Instant,
    shutdown: bool,
}

#[derive(Debug)]
struct SimpleShared {
    always_close: bool,
    slot: Mutex<Slot>,
}

impl SimpleShared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConnectionRelease for SimpleShared {
    fn release(&self, mut conn: HttpConnection) {
        let mut slot = self.lock();
        if self.always_close || slot.shutdown {
            conn.close();
        }
        slot.conn = Some(conn);
        slot.in_use = false;
        slot.released_at = Instant::now();
    }
}

/// A manager for exactly one connection.
#[derive(Debug)]
pub struct SimpleConnectionManager {
    params: ConnectionManagerParams,
    shared: Arc<SimpleShared>,
}

impl Default for SimpleConnectionManager {
    fn default() -> Self {
        Self::new(false)
    }
}

impl SimpleConnectionManager {
    /// With `always_close`, the connection is closed on every release instead of kept alive.
    #[must_use]
    pub fn new(always_close: bool) -> Self {
        Self::with_params(ConnectionManagerParams::default(), always_close)
    }

    #[must_use]
    pub fn with_params(params: ConnectionManagerParams, always_close: bool) -> Self {
        Self {
            params,
            shared: Arc::new(SimpleShared {
                always_close,
                slot: Mutex::new(Slot {
                    conn: None,
                    in_use: false,
                    released_at: Instant::now(),
                    shutdown: false,
                }),
            }),
        }
    }

    #[must_use]
    pub fn is_always_close(&self) -> bool {
        self.shared.always_close
    }
}

impl HttpConnectionManager for SimpleConnectionManager {
    fn get_connection(
        &self,
        config: &HostConfiguration,
        _timeout: Option<Duration>,
    ) -> Result<PooledConnection> {
        let mut slot = self.shared.lock();
        if slot.shutdown {
            return Err(error::usage(ConnectionShutdown));
        }
        if slot.in_use {
            return Err(error::usage(
                "the single connection is already checked out; release it first",
            ));
        }

        let (conn, fresh) = match slot.conn.take() {
            Some(conn) if conn.host_configuration() == config => (conn, false),
            Some(mut previous) => {
                tracing::debug!("Reconfiguring single connection for {}", config);
                previous.close();
                (HttpConnection::new(config.clone(), self.params.connection.clone()), true)
            }
            None => (HttpConnection::new(config.clone(), self.params.connection.clone()), true),
        };
        slot.in_use = true;
        drop(slot);

        conn.touch();
        let releaser: Arc<dyn ConnectionRelease> = self.shared.clone();
        Ok(PooledConnection::new(conn, releaser, fresh))
    }

    fn close_idle_connections(&self, idle: Duration) {
        let mut slot = self.shared.lock();
        if slot.in_use || slot.released_at.elapsed() <= idle {
            return;
        }
        if let Some(conn) = slot.conn.as_mut() {
            conn.close();
        }
    }

    fn shutdown(&self) {
        let mut slot = self.shared.lock();
        slot.shutdown = true;
        if let Some(conn) = slot.conn.as_mut() {
            conn.close();
        }
    }

    fn params(&self) -> &ConnectionManagerParams {
        &self.params
    }
}
