//! Configuration module
//!
//! Parameter sets for methods, hosts, clients and connection managers,
//! layered from most specific to the global defaults.

pub mod client;
pub mod defaults;
pub mod host;
pub mod manager;
pub mod method;
pub mod validation;

pub use client::ClientParams;
pub use defaults::{global_params, init_global_params};
pub use host::HostParams;
pub use manager::{ConnectionManagerParams, ConnectionParams};
pub use method::MethodParams;
pub use validation::{ConfigResult, ConfigurationError, Validator};
