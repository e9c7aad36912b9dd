//! Built-in defaults and the process-wide parameter set

use std::sync::OnceLock;
use std::time::Duration;

use super::method::MethodParams;

/// `User-Agent` sent when no parameter layer overrides it
pub const USER_AGENT: &str = concat!("tether/", env!("CARGO_PKG_VERSION"));

/// Redirect hop budget
pub const MAX_REDIRECTS: u32 = 100;

/// Wait for a provisional `100 Continue` before sending the body anyway
pub const CONTINUE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Connections allowed per host configuration
pub const MAX_HOST_CONNECTIONS: usize = 2;

/// Connections allowed across all host configurations
pub const MAX_TOTAL_CONNECTIONS: usize = 20;

/// Bound on proxy authentication round-trips while opening a CONNECT tunnel
pub const MAX_TUNNEL_AUTH_ATTEMPTS: u32 = 10;

/// How often the pool maintenance thread wakes when it is enabled
pub const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(5);

static GLOBAL_PARAMS: OnceLock<MethodParams> = OnceLock::new();

/// The bottom layer of every parameter chain.
pub fn global_params() -> &'static MethodParams {
    GLOBAL_PARAMS.get_or_init(MethodParams::new)
}

/// Install process-wide defaults. Only the first call takes effect.
///
/// Returns false if the global parameters were already initialized.
pub fn init_global_params(params: MethodParams) -> bool {
    let installed = GLOBAL_PARAMS.set(params).is_ok();
    if !installed {
        tracing::warn!("Global method parameters already initialized; ignoring new defaults");
    }
    installed
}
