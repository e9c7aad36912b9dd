//! # Tether client engine
//!
//! Blocking HTTP/1.0 and HTTP/1.1 client engine with a bounded pool of
//! persistent connections, proxy support with CONNECT tunnels, redirects,
//! authentication challenges, cookies and retry on transport failure.
//!
//! ## Usage
//!
//! ```no_run
//! use tether_client::{HttpClient, HttpMethod};
//!
//! fn main() -> tether_client::Result<()> {
//!     let client = HttpClient::new();
//!     let mut method = HttpMethod::get("http://example.com/")?;
//!     let status = client.execute_method(&mut method)?;
//!     let body = method.response_body_as_string()?;
//!     println!("{status}: {} bytes", body.len());
//!     Ok(())
//! }
//! ```
//!
//! The response body stays on the connection until it is read. Reading it
//! to the end, calling [`HttpMethod::release_connection`] or dropping the
//! method hands the connection back to the pool.

#![deny(unsafe_code)]
#![warn(clippy::all)]

use std::sync::OnceLock;

pub mod auth;
pub mod client;
pub mod config;
pub mod connect;
pub mod cookie;
pub mod error;
pub mod http;
pub mod method;
pub mod pool;
pub mod redirect;
pub mod retry;
pub mod state;

mod director;

pub mod prelude;

pub use crate::prelude::*;

pub use director::ProxyResponse;

static GLOBAL_CLIENT: OnceLock<HttpClient> = OnceLock::new();

/// The process-wide client with a pooling connection manager.
///
/// Initialized on first use; clones share its pool, state and statistics.
pub fn global_client() -> HttpClient {
    GLOBAL_CLIENT.get_or_init(HttpClient::new).clone()
}

/// Install the process-wide client. Only the first call takes effect.
///
/// Returns false if the global client was already initialized.
pub fn init_global_client(client: HttpClient) -> bool {
    let installed = GLOBAL_CLIENT.set(client).is_ok();
    if !installed {
        tracing::warn!("Global client already initialized; ignoring replacement");
    }
    installed
}

/// Statistics of the process-wide client.
#[must_use]
pub fn connection_stats() -> ClientStatsSnapshot {
    global_client().stats().snapshot()
}
