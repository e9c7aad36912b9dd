//! Client statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters shared by every clone of one client.
#[derive(Debug)]
pub struct ClientStats {
    /// Methods handed to `execute_method`
    pub requests_total: AtomicU64,
    /// Methods that ended with a status below 400
    pub requests_successful: AtomicU64,
    /// Methods that failed or ended with a status of 400 or above
    pub requests_failed: AtomicU64,
    /// Redirects followed
    pub redirects: AtomicU64,
    /// Attempts repeated after a transport failure
    pub retries: AtomicU64,
    /// Authentication challenges answered
    pub auth_challenges: AtomicU64,
    /// CONNECT tunnels requested
    pub tunnels: AtomicU64,
    pub created_at: Instant,
}

impl Default for ClientStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_successful: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            redirects: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            auth_challenges: AtomicU64::new(0),
            tunnels: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.requests_successful.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_redirect(&self) {
        self.redirects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_challenge(&self) {
        self.auth_challenges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tunnel(&self) {
        self.tunnels.fetch_add(1, Ordering::Relaxed);
    }

    /// Share of requests that succeeded, 0.0 before the first one.
    #[must_use]
    pub fn success_ratio(&self) -> f64 {
        let total = self.requests_total.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            let successful = self.requests_successful.load(Ordering::Relaxed);
            #[allow(clippy::cast_precision_loss)]
            {
                successful as f64 / total as f64
            }
        }
    }

    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    #[must_use]
    pub fn snapshot(&self) -> ClientStatsSnapshot {
        ClientStatsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_successful: self.requests_successful.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            redirects: self.redirects.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            auth_challenges: self.auth_challenges.load(Ordering::Relaxed),
            tunnels: self.tunnels.load(Ordering::Relaxed),
            success_ratio: self.success_ratio(),
            age: self.age(),
        }
    }
}

/// Snapshot of client statistics at a point in time
#[derive(Debug, Clone)]
pub struct ClientStatsSnapshot {
    pub requests_total: u64,
    pub requests_successful: u64,
    pub requests_failed: u64,
    pub redirects: u64,
    pub retries: u64,
    pub auth_challenges: u64,
    pub tunnels: u64,
    pub success_ratio: f64,
    pub age: Duration,
}
