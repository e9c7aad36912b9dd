//! Parameters bound to a host configuration

use serde::{Deserialize, Serialize};

use super::method::MethodParams;

/// Defaults for every method sent through one host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostParams {
    /// Method parameter defaults for this host
    pub method: MethodParams,
    /// Request headers added to every method that does not set them itself
    pub default_headers: Vec<(String, String)>,
}

impl HostParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method_params(mut self, params: MethodParams) -> Self {
        self.method = params;
        self
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }
}
