//! Background pool maintenance
//!
//! Closes idle free connections and reclaims capacity from checked-out
//! connections whose last activity is older than the grace period. The
//! thread holds only a weak reference to the pool and exits once the pool
//! is gone or it is told to stop.

use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::multi::PoolShared;

#[derive(Debug)]
pub(crate) struct MaintenanceHandle {
    stop: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl MaintenanceHandle {
    pub fn spawn(pool: Weak<PoolShared>, interval: Duration) -> Option<Self> {
        let (stop, stopped) = crossbeam_channel::bounded(1);
        let spawned = thread::Builder::new()
            .name("tether-pool-maintenance".to_string())
            .spawn(move || run(&pool, &stopped, interval));

        match spawned {
            Ok(thread) => Some(Self {
                stop,
                thread: Some(thread),
            }),
            Err(e) => {
                tracing::warn!("Failed to start pool maintenance thread: {}", e);
                None
            }
        }
    }

    pub fn stop(mut self) {
        let _ = self.stop.try_send(());
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("Pool maintenance thread panicked");
        }
    }
}

fn run(pool: &Weak<PoolShared>, stopped: &Receiver<()>, interval: Duration) {
    tracing::debug!("Pool maintenance running every {:?}", interval);
    loop {
        match stopped.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let Some(pool) = pool.upgrade() else {
                    break;
                };
                pool.maintain();
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::debug!("Pool maintenance stopped");
}
