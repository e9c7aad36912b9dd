//! Per-host pool records

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar};
use std::time::Instant;

use crate::connect::{HostConfiguration, HttpConnection};

/// A connection sitting in a free list.
#[derive(Debug)]
pub(crate) struct FreeConnection {
    pub conn: HttpConnection,
    pub freed_at: Instant,
}

/// A thread blocked in `get_connection`.
///
/// Each waiter has its own condition variable over the pool lock, so a
/// release can wake a waiter for a particular host.
#[derive(Debug)]
pub(crate) struct WaitingThread {
    pub cond: Condvar,
    pub config: HostConfiguration,
    notified: AtomicBool,
}

impl WaitingThread {
    pub fn new(config: HostConfiguration) -> Arc<Self> {
        Arc::new(Self {
            cond: Condvar::new(),
            config,
            notified: AtomicBool::new(false),
        })
    }

    pub fn notify(&self) {
        self.notified.store(true, Ordering::Release);
        self.cond.notify_one();
    }

    pub fn was_notified(&self) -> bool {
        self.notified.load(Ordering::Acquire)
    }
}

/// Connections for one host configuration.
#[derive(Debug, Default)]
pub(crate) struct HostConnectionPool {
    pub free: VecDeque<FreeConnection>,
    pub waiting: VecDeque<Arc<WaitingThread>>,
    /// Open or checked-out connections counted against this host's cap
    pub num_connections: usize,
}

impl HostConnectionPool {
    /// Most recently freed connection first.
    pub fn take_free(&mut self) -> Option<FreeConnection> {
        self.free.pop_back()
    }

    pub fn take_free_by_id(&mut self, id: u64) -> Option<FreeConnection> {
        let index = self.free.iter().position(|f| f.conn.id() == id)?;
        self.free.remove(index)
    }

    pub fn remove_waiter(&mut self, waiter: &Arc<WaitingThread>) {
        self.waiting.retain(|w| !Arc::ptr_eq(w, waiter));
    }

    pub fn is_empty(&self) -> bool {
        self.num_connections == 0 && self.free.is_empty() && self.waiting.is_empty()
    }
}

/// A checked-out connection the pool keeps track of.
#[derive(Debug)]
pub(crate) struct Lease {
    pub config: HostConfiguration,
    pub activity: Arc<AtomicU64>,
}
