//! Cooperative cancellation

use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::connect::HttpConnection;

#[derive(Debug, Default)]
struct AbortInner {
    aborted: AtomicBool,
    socket: Mutex<Option<TcpStream>>,
}

/// Aborts a method from any thread.
///
/// Aborting marks the method and shuts down the socket it is using, so a
/// thread blocked reading or writing it fails with an io error. The
/// connection is closed, never returned to the pool intact.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    inner: Arc<AbortInner>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::SeqCst);
        let socket = self
            .inner
            .socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(socket) = socket {
            tracing::debug!("Aborting method; shutting down its connection");
            let _ = socket.shutdown(Shutdown::Both);
        }
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Track the socket of `conn` while the method uses it.
    pub(crate) fn attach(&self, conn: &HttpConnection) {
        let handle = conn.shutdown_handle().ok();
        *self
            .inner
            .socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = handle;
        if self.is_aborted() {
            self.abort();
        }
    }

    pub(crate) fn detach(&self) {
        self.inner
            .socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub(crate) fn reset(&self) {
        self.detach();
        self.inner.aborted.store(false, Ordering::SeqCst);
    }
}
