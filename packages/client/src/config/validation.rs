//! Configuration validation
//!
//! Rejects parameter combinations that would make the pool or the director
//! unusable before any connection is attempted.

use std::time::Duration;

use super::client::ClientParams;
use super::manager::ConnectionManagerParams;
use super::method::MethodParams;

/// Configuration validation result type
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid timeout value: {0}")]
    InvalidTimeout(String),

    #[error("Invalid configuration parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration conflict: {0}")]
    Conflict(String),
}

/// Configuration validation trait
pub trait Validator {
    /// Validates the configuration settings
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` variant if any validation fails.
    fn validate(&self) -> ConfigResult<()>;
}

fn non_zero_timeout(timeout: Option<Duration>, name: &str) -> ConfigResult<()> {
    match timeout {
        Some(t) if t.is_zero() => Err(ConfigurationError::InvalidTimeout(format!(
            "{name} cannot be zero; leave it unset to disable"
        ))),
        _ => Ok(()),
    }
}

impl Validator for ConnectionManagerParams {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_connections_per_host == 0 {
            return Err(ConfigurationError::InvalidParameter(
                "max_connections_per_host must be at least 1".to_string(),
            ));
        }
        if self.max_total_connections == 0 {
            return Err(ConfigurationError::InvalidParameter(
                "max_total_connections must be at least 1".to_string(),
            ));
        }
        if self.max_connections_per_host > self.max_total_connections {
            return Err(ConfigurationError::Conflict(format!(
                "max_connections_per_host ({}) exceeds max_total_connections ({})",
                self.max_connections_per_host, self.max_total_connections
            )));
        }
        if self.max_host_connections.values().any(|max| *max == 0) {
            return Err(ConfigurationError::InvalidParameter(
                "per-host connection limits must be at least 1".to_string(),
            ));
        }
        if self.needs_maintenance() && self.maintenance_interval.is_zero() {
            return Err(ConfigurationError::InvalidTimeout(
                "maintenance_interval cannot be zero".to_string(),
            ));
        }
        non_zero_timeout(self.connection.connection_timeout, "connection_timeout")?;
        non_zero_timeout(self.idle_timeout, "idle_timeout")?;
        non_zero_timeout(self.abandoned_grace, "abandoned_grace")
    }
}

impl Validator for MethodParams {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_redirects == Some(0) {
            return Err(ConfigurationError::InvalidParameter(
                "max_redirects must be at least 1".to_string(),
            ));
        }
        non_zero_timeout(self.continue_timeout, "continue_timeout")
    }
}

impl Validator for ClientParams {
    fn validate(&self) -> ConfigResult<()> {
        self.method.validate()?;
        if self.max_tunnel_auth_attempts == Some(0) {
            return Err(ConfigurationError::InvalidParameter(
                "max_tunnel_auth_attempts must be at least 1".to_string(),
            ));
        }
        non_zero_timeout(self.connection_manager_timeout, "connection_manager_timeout")
    }
}
