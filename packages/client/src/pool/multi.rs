//! Thread-safe pooling connection manager
//!
//! All bookkeeping sits behind one mutex. Threads that find no capacity park
//! on their own condition variable over that mutex; a release wakes a waiter
//! for the same host first and any other waiter otherwise.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use hashbrown::{HashMap, HashSet};

use super::host_pool::{FreeConnection, HostConnectionPool, Lease, WaitingThread};
use super::maintenance::MaintenanceHandle;
use super::{ConnectionRelease, HttpConnectionManager, PooledConnection};
use crate::config::{ConnectionManagerParams, Validator};
use crate::connect::connection::now_millis;
use crate::connect::{HostConfiguration, HttpConnection};
use crate::error::{self, ConnectionShutdown, Result};

#[derive(Debug, Default)]
struct PoolState {
    hosts: HashMap<HostConfiguration, HostConnectionPool>,
    /// Free connections across all hosts, least recently freed first
    free_order: VecDeque<(HostConfiguration, u64)>,
    waiting: VecDeque<Arc<WaitingThread>>,
    num_connections: usize,
    leases: HashMap<u64, Lease>,
    /// Leases reclaimed as abandoned whose connection may still come back
    reclaimed: HashSet<u64>,
    shutdown: bool,
}

impl PoolState {
    fn host_pool(&mut self, config: &HostConfiguration) -> &mut HostConnectionPool {
        self.hosts.entry(config.clone()).or_default()
    }

    fn take_free(&mut self, config: &HostConfiguration) -> Option<HttpConnection> {
        let free = self.hosts.get_mut(config)?.take_free()?;
        let id = free.conn.id();
        self.free_order.retain(|(_, free_id)| *free_id != id);
        Some(free.conn)
    }

    fn create(&mut self, config: &HostConfiguration, params: &ConnectionManagerParams) -> HttpConnection {
        let conn = HttpConnection::new(config.clone(), params.connection.clone());
        self.host_pool(config).num_connections += 1;
        self.num_connections += 1;
        tracing::debug!(
            "Allocating new connection {}, hostConfig={}, total={}",
            conn.id(),
            config,
            self.num_connections
        );
        conn
    }

    /// Close the least recently freed connection of any host to make room.
    fn evict_oldest(&mut self) -> bool {
        let Some((config, id)) = self.free_order.pop_front() else {
            return false;
        };
        if let Some(mut free) = self.hosts.get_mut(&config).and_then(|pool| pool.take_free_by_id(id)) {
            tracing::debug!("Reclaiming connection {} of {} to make room", id, config);
            free.conn.close();
        }
        self.delete_connection(&config);
        true
    }

    fn delete_connection(&mut self, config: &HostConfiguration) {
        let pool = self.host_pool(config);
        pool.num_connections = pool.num_connections.saturating_sub(1);
        self.num_connections = self.num_connections.saturating_sub(1);
        self.prune(config);
    }

    /// Forget a host with no connections and nobody waiting for one.
    fn prune(&mut self, config: &HostConfiguration) {
        if self.hosts.get(config).is_some_and(HostConnectionPool::is_empty) {
            tracing::trace!("Removing empty pool for {}", config);
            self.hosts.remove(config);
        }
    }

    /// Wake one waiter, preferring one that wants `config`.
    fn notify_waiting(&mut self, config: &HostConfiguration) {
        let waiter = if let Some(pool) = self.hosts.get_mut(config)
            && let Some(waiter) = pool.waiting.pop_front()
        {
            self.waiting.retain(|w| !Arc::ptr_eq(w, &waiter));
            Some(waiter)
        } else if let Some(waiter) = self.waiting.pop_front() {
            if let Some(pool) = self.hosts.get_mut(&waiter.config) {
                pool.remove_waiter(&waiter);
            }
            Some(waiter)
        } else {
            None
        };

        if let Some(waiter) = waiter {
            tracing::debug!("Notifying thread waiting on {}", waiter.config);
            waiter.notify();
        }
    }

    fn remove_waiter(&mut self, waiter: &Arc<WaitingThread>) {
        self.waiting.retain(|w| !Arc::ptr_eq(w, waiter));
        if let Some(pool) = self.hosts.get_mut(&waiter.config) {
            pool.remove_waiter(waiter);
        }
        self.prune(&waiter.config);
    }
}

#[derive(Debug)]
pub(crate) struct PoolShared {
    params: ConnectionManagerParams,
    state: Mutex<PoolState>,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close_idle_connections(&self, idle: Duration) {
        let mut state = self.lock();
        for pool in state.hosts.values_mut() {
            for free in &mut pool.free {
                if free.conn.is_open() && free.freed_at.elapsed() > idle {
                    tracing::debug!("Closing connection {} idle for {:?}", free.conn.id(), free.freed_at.elapsed());
                    free.conn.close();
                }
            }
        }
    }

    fn delete_closed_connections(&self) {
        let mut state = self.lock();
        let mut removed = Vec::new();
        for (config, pool) in &mut state.hosts {
            pool.free.retain(|free| {
                let open = free.conn.is_open();
                if !open {
                    removed.push((config.clone(), free.conn.id()));
                }
                open
            });
        }
        for (config, id) in removed {
            tracing::debug!("Deleting closed connection {} of {}", id, config);
            state.free_order.retain(|(_, free_id)| *free_id != id);
            state.delete_connection(&config);
            state.notify_waiting(&config);
        }
    }

    /// Return capacity held by checked-out connections nobody has touched within `grace`.
    fn reclaim_abandoned(&self, grace: Duration) {
        let now = now_millis();
        let grace = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        let mut state = self.lock();
        let abandoned: Vec<u64> = state
            .leases
            .iter()
            .filter(|(_, lease)| {
                now.saturating_sub(lease.activity.load(std::sync::atomic::Ordering::Relaxed)) > grace
            })
            .map(|(id, _)| *id)
            .collect();

        for id in abandoned {
            if let Some(lease) = state.leases.remove(&id) {
                tracing::warn!(
                    "Reclaiming connection {} of {}: checked out and idle beyond the grace period",
                    id,
                    lease.config
                );
                state.reclaimed.insert(id);
                state.delete_connection(&lease.config);
                state.notify_waiting(&lease.config);
            }
        }
    }

    pub(crate) fn maintain(&self) {
        if let Some(idle) = self.params.idle_timeout {
            self.close_idle_connections(idle);
            self.delete_closed_connections();
        }
        if let Some(grace) = self.params.abandoned_grace {
            self.reclaim_abandoned(grace);
        }
    }
}

impl ConnectionRelease for PoolShared {
    fn release(&self, mut conn: HttpConnection) {
        let id = conn.id();
        let mut state = self.lock();
        let Some(lease) = state.leases.remove(&id) else {
            if state.reclaimed.remove(&id) {
                tracing::warn!("Connection {} came back after being reclaimed; closing it", id);
            } else {
                tracing::warn!("Connection {} was not checked out from this pool; closing it", id);
            }
            drop(state);
            conn.close();
            return;
        };

        if state.shutdown {
            conn.close();
            state.delete_connection(&lease.config);
            return;
        }

        tracing::debug!("Freeing connection {}, hostConfig={}", id, lease.config);
        state.free_order.push_back((lease.config.clone(), id));
        state.host_pool(&lease.config).free.push_back(FreeConnection {
            conn,
            freed_at: Instant::now(),
        });
        state.notify_waiting(&lease.config);
    }
}

/// Pooling manager safe to share between threads.
///
/// Enforces `max_connections_per_host` for every host configuration and
/// `max_total_connections` across all of them.
#[derive(Debug)]
pub struct MultiThreadedConnectionManager {
    shared: Arc<PoolShared>,
    maintenance: Mutex<Option<MaintenanceHandle>>,
}

impl Default for MultiThreadedConnectionManager {
    fn default() -> Self {
        Self::build(ConnectionManagerParams::default())
    }
}

impl MultiThreadedConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager with validated parameters.
    ///
    /// Starts the maintenance thread when an idle timeout or abandoned grace
    /// period is configured.
    pub fn with_params(params: ConnectionManagerParams) -> Result<Self> {
        params.validate()?;
        Ok(Self::build(params))
    }

    fn build(params: ConnectionManagerParams) -> Self {
        let interval = params.maintenance_interval;
        let needs_maintenance = params.needs_maintenance();
        let shared = Arc::new(PoolShared {
            params,
            state: Mutex::new(PoolState::default()),
        });
        let maintenance = if needs_maintenance {
            MaintenanceHandle::spawn(Arc::downgrade(&shared), interval)
        } else {
            None
        };
        Self {
            shared,
            maintenance: Mutex::new(maintenance),
        }
    }

    /// Remove closed connections from the free lists and give back their capacity.
    pub fn delete_closed_connections(&self) {
        self.shared.delete_closed_connections();
    }

    /// Connections counted against `config`'s cap, free or checked out.
    #[must_use]
    pub fn connections_in_pool(&self, config: &HostConfiguration) -> usize {
        self.shared
            .lock()
            .hosts
            .get(config)
            .map_or(0, |pool| pool.num_connections)
    }

    /// Connections counted against the global cap.
    #[must_use]
    pub fn connections_in_pool_total(&self) -> usize {
        self.shared.lock().num_connections
    }

    /// Connections for `config` currently checked out.
    #[must_use]
    pub fn connections_in_use(&self, config: &HostConfiguration) -> usize {
        self.shared
            .lock()
            .leases
            .values()
            .filter(|lease| lease.config == *config)
            .count()
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.lock().shutdown
    }

    fn stop_maintenance(&self) {
        let handle = self
            .maintenance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop();
        }
    }
}

impl HttpConnectionManager for MultiThreadedConnectionManager {
    fn get_connection(
        &self,
        config: &HostConfiguration,
        timeout: Option<Duration>,
    ) -> Result<PooledConnection> {
        let params = &self.shared.params;
        let max_host = params.max_connections_for(config);
        let max_total = params.max_total_connections;
        let deadline = timeout.filter(|t| !t.is_zero()).map(|t| Instant::now() + t);

        let mut state = self.shared.lock();
        let (conn, fresh) = loop {
            if state.shutdown {
                return Err(error::usage(ConnectionShutdown));
            }

            if let Some(conn) = state.take_free(config) {
                tracing::debug!("Getting free connection {}, hostConfig={}", conn.id(), config);
                break (conn, false);
            }

            let host_count = state.host_pool(config).num_connections;
            if host_count < max_host && state.num_connections < max_total {
                break (state.create(config, params), true);
            }
            if host_count < max_host && state.evict_oldest() {
                break (state.create(config, params), true);
            }

            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::debug!("Timed out waiting for a connection to {}", config);
                        return Err(error::pool_timeout());
                    }
                    Some(deadline - now)
                }
                None => None,
            };

            tracing::debug!("Unable to get a connection for {}, waiting", config);
            let waiter = WaitingThread::new(config.clone());
            state.host_pool(config).waiting.push_back(Arc::clone(&waiter));
            state.waiting.push_back(Arc::clone(&waiter));

            state = match remaining {
                Some(remaining) => {
                    waiter
                        .cond
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => waiter.cond.wait(state).unwrap_or_else(PoisonError::into_inner),
            };

            if !waiter.was_notified() {
                tracing::trace!("Woke without notification while waiting on {}", config);
            }
            state.remove_waiter(&waiter);
        };

        state.leases.insert(
            conn.id(),
            Lease {
                config: config.clone(),
                activity: conn.activity(),
            },
        );
        drop(state);

        conn.touch();
        let releaser: Arc<dyn ConnectionRelease> = self.shared.clone();
        Ok(PooledConnection::new(conn, releaser, fresh))
    }

    fn close_idle_connections(&self, idle: Duration) {
        self.shared.close_idle_connections(idle);
    }

    fn shutdown(&self) {
        self.stop_maintenance();
        let mut state = self.shared.lock();
        if state.shutdown {
            return;
        }
        state.shutdown = true;
        tracing::debug!("Shutting down connection manager");

        let mut closed = 0;
        for pool in state.hosts.values_mut() {
            let freed = pool.free.len();
            pool.free.clear();
            pool.num_connections = pool.num_connections.saturating_sub(freed);
            closed += freed;
            pool.waiting.clear();
        }
        state.num_connections = state.num_connections.saturating_sub(closed);
        state.free_order.clear();
        for waiter in std::mem::take(&mut state.waiting) {
            waiter.notify();
        }
    }

    fn params(&self) -> &ConnectionManagerParams {
        &self.shared.params
    }
}

impl Drop for MultiThreadedConnectionManager {
    fn drop(&mut self) {
        self.stop_maintenance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str) -> HostConfiguration {
        HostConfiguration::for_url(&url::Url::parse(name).expect("url")).expect("config")
    }

    #[test]
    fn empty_host_pools_are_forgotten() {
        let params = ConnectionManagerParams::default();
        let mut state = PoolState::default();
        let configs: Vec<_> = (0..50)
            .map(|i| host(&format!("http://host-{i}.test")))
            .collect();

        for config in &configs {
            let _conn = state.create(config, &params);
            state.delete_connection(config);
        }
        assert!(state.hosts.is_empty());
        assert_eq!(state.num_connections, 0);
    }

    #[test]
    fn host_with_a_waiter_is_kept() {
        let params = ConnectionManagerParams::default();
        let mut state = PoolState::default();
        let config = host("http://busy.test");

        let _conn = state.create(&config, &params);
        let waiter = WaitingThread::new(config.clone());
        state.host_pool(&config).waiting.push_back(Arc::clone(&waiter));
        state.waiting.push_back(Arc::clone(&waiter));

        state.delete_connection(&config);
        assert!(state.hosts.contains_key(&config));

        state.remove_waiter(&waiter);
        assert!(state.hosts.is_empty());
    }
}
