//! Connection targets

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

use url::Url;

use super::protocol::Protocol;
use crate::config::HostParams;
use crate::error::{self, Result};

/// A target host: name, port and protocol.
#[derive(Debug, Clone)]
pub struct HttpHost {
    name: String,
    port: u16,
    protocol: Protocol,
}

impl HttpHost {
    pub fn new(name: impl Into<String>, port: Option<u16>, protocol: Protocol) -> Self {
        let port = protocol.resolve_port(port);
        Self {
            name: name.into(),
            port,
            protocol,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// `scheme://host[:port]`, omitting the port when it is the scheme default.
    #[must_use]
    pub fn to_uri(&self) -> String {
        if self.port == self.protocol.default_port() {
            format!("{}://{}", self.protocol.scheme(), self.name)
        } else {
            format!("{}://{}:{}", self.protocol.scheme(), self.name, self.port)
        }
    }
}

impl PartialEq for HttpHost {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.port == other.port
            && self.protocol == other.protocol
    }
}

impl Eq for HttpHost {}

impl Hash for HttpHost {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_ascii_lowercase().hash(state);
        self.port.hash(state);
        self.protocol.hash(state);
    }
}

/// An HTTP proxy, addressed in plain text.
#[derive(Debug, Clone)]
pub struct ProxyHost {
    name: String,
    port: u16,
}

impl ProxyHost {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl PartialEq for ProxyHost {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && self.port == other.port
    }
}

impl Eq for ProxyHost {}

impl Hash for ProxyHost {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_ascii_lowercase().hash(state);
        self.port.hash(state);
    }
}

/// Where a connection goes: target host, optional proxy and local bind address.
///
/// Host parameters travel with the configuration but do not take part in
/// equality, so two requests to the same place share pooled connections
/// regardless of their parameters.
#[derive(Debug, Clone, Default)]
pub struct HostConfiguration {
    host: Option<HttpHost>,
    proxy: Option<ProxyHost>,
    local_address: Option<IpAddr>,
    params: HostParams,
}

impl HostConfiguration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration targeting the host of an absolute URL.
    pub fn for_url(url: &Url) -> Result<Self> {
        let mut config = Self::new();
        config.set_host_url(url)?;
        Ok(config)
    }

    /// Target the scheme, host and port of `url`, keeping proxy and local address.
    pub fn set_host_url(&mut self, url: &Url) -> Result<()> {
        let protocol = Protocol::get(url.scheme()).ok_or_else(|| {
            error::builder(format!("unsupported protocol: {}", url.scheme())).with_url(url.clone())
        })?;
        let name = url
            .host_str()
            .ok_or_else(|| error::builder("URL has no host").with_url(url.clone()))?;
        self.host = Some(HttpHost::new(name, url.port(), protocol));
        Ok(())
    }

    pub fn set_host(&mut self, name: impl Into<String>, port: Option<u16>, protocol: Protocol) {
        self.host = Some(HttpHost::new(name, port, protocol));
    }

    pub fn set_proxy(&mut self, name: impl Into<String>, port: u16) {
        self.proxy = Some(ProxyHost::new(name, port));
    }

    pub fn clear_proxy(&mut self) {
        self.proxy = None;
    }

    pub fn set_local_address(&mut self, address: Option<IpAddr>) {
        self.local_address = address;
    }

    pub fn set_params(&mut self, params: HostParams) {
        self.params = params;
    }

    #[must_use]
    pub fn with_proxy(mut self, name: impl Into<String>, port: u16) -> Self {
        self.set_proxy(name, port);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: HostParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn http_host(&self) -> Option<&HttpHost> {
        self.host.as_ref()
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_ref().map(HttpHost::name)
    }

    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.host.as_ref().map(HttpHost::port)
    }

    #[must_use]
    pub fn protocol(&self) -> Option<&Protocol> {
        self.host.as_ref().map(HttpHost::protocol)
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&ProxyHost> {
        self.proxy.as_ref()
    }

    #[must_use]
    pub fn proxy_host(&self) -> Option<&str> {
        self.proxy.as_ref().map(ProxyHost::name)
    }

    #[must_use]
    pub fn proxy_port(&self) -> Option<u16> {
        self.proxy.as_ref().map(ProxyHost::port)
    }

    #[must_use]
    pub fn is_proxied(&self) -> bool {
        self.proxy.is_some()
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.protocol().is_some_and(Protocol::is_secure)
    }

    #[must_use]
    pub fn local_address(&self) -> Option<IpAddr> {
        self.local_address
    }

    #[must_use]
    pub fn params(&self) -> &HostParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut HostParams {
        &mut self.params
    }

    /// `scheme://host[:port]` of the target, if one is set.
    #[must_use]
    pub fn host_uri(&self) -> Option<String> {
        self.host.as_ref().map(HttpHost::to_uri)
    }
}

impl PartialEq for HostConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
            && self.proxy == other.proxy
            && self.local_address == other.local_address
    }
}

impl Eq for HostConfiguration {}

impl Hash for HostConfiguration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.proxy.hash(state);
        self.local_address.hash(state);
    }
}

impl fmt::Display for HostConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostConfiguration[")?;
        let mut sep = "";
        if let Some(host) = &self.host {
            write!(f, "host={}", host.to_uri())?;
            sep = ", ";
        }
        if let Some(proxy) = &self.proxy {
            write!(f, "{sep}proxyHost={}:{}", proxy.name, proxy.port)?;
            sep = ", ";
        }
        if let Some(local) = self.local_address {
            write!(f, "{sep}localAddress={local}")?;
        }
        f.write_str("]")
    }
}
