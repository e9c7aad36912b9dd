//! Connection managers
//!
//! A manager hands out exclusive [`PooledConnection`] guards. Dropping a
//! guard gives the connection back; there is no other release path, so a
//! connection cannot be released twice.

pub mod host_pool;
pub mod maintenance;
pub mod multi;
pub mod simple;

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

pub use multi::MultiThreadedConnectionManager;
pub use simple::SimpleConnectionManager;

use crate::config::ConnectionManagerParams;
use crate::connect::{HostConfiguration, HttpConnection};
use crate::error::Result;

/// Source of connections for the director.
pub trait HttpConnectionManager: Send + Sync + fmt::Debug {
    /// Check out a connection for `config`, waiting at most `timeout` for
    /// capacity. `None` or a zero timeout waits indefinitely.
    fn get_connection(
        &self,
        config: &HostConfiguration,
        timeout: Option<Duration>,
    ) -> Result<PooledConnection>;

    /// Close free connections that have been idle for longer than `idle`.
    fn close_idle_connections(&self, idle: Duration);

    /// Close everything and refuse further checkouts.
    fn shutdown(&self);

    fn params(&self) -> &ConnectionManagerParams;
}

/// Where a guard sends its connection when dropped.
pub(crate) trait ConnectionRelease: Send + Sync {
    fn release(&self, conn: HttpConnection);
}

/// Exclusive use of one connection until dropped.
pub struct PooledConnection {
    conn: HttpConnection,
    releaser: Option<Arc<dyn ConnectionRelease>>,
    fresh: bool,
}

impl PooledConnection {
    pub(crate) fn new(conn: HttpConnection, releaser: Arc<dyn ConnectionRelease>, fresh: bool) -> Self {
        Self {
            conn,
            releaser: Some(releaser),
            fresh,
        }
    }

    /// True if the manager created this connection for this checkout
    /// rather than reusing a pooled one.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Give the connection back now.
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for PooledConnection {
    type Target = HttpConnection;

    fn deref(&self) -> &HttpConnection {
        &self.conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut HttpConnection {
        &mut self.conn
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(releaser) = self.releaser.take() {
            let conn = std::mem::replace(&mut self.conn, HttpConnection::detached());
            releaser.release(conn);
        }
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.conn.id())
            .field("config", &self.conn.host_configuration())
            .field("open", &self.conn.is_open())
            .field("fresh", &self.fresh)
            .finish()
    }
}
