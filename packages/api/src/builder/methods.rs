//! Terminal verbs
//!
//! Each verb builds an engine method from the builder's settings, executes
//! it on the builder's client and wraps the outcome in a [`Response`].

use http::Method;
use tether_client::auth::{AuthScope, CredentialsKind};
use tether_client::{ByteArrayEntity, HttpMethod, Result, error};

use crate::builder::core::{BodyNotSet, BodySet, Tether};
use crate::response::Response;

impl Tether<BodyNotSet> {
    /// Execute a GET request
    ///
    /// # Examples
    /// ```no_run
    /// use tether::Tether;
    ///
    /// let users: Vec<String> = Tether::json_api()
    ///     .get("http://api.example.com/users")?
    ///     .json()?;
    /// # Ok::<(), tether::Error>(())
    /// ```
    pub fn get(self, url: &str) -> Result<Response> {
        self.send(Method::GET, url)
    }

    /// Execute a HEAD request. The response never has a body.
    pub fn head(self, url: &str) -> Result<Response> {
        self.send(Method::HEAD, url)
    }

    /// Execute a DELETE request
    pub fn delete(self, url: &str) -> Result<Response> {
        self.send(Method::DELETE, url)
    }

    /// Execute an OPTIONS request
    pub fn options(self, url: &str) -> Result<Response> {
        self.send(Method::OPTIONS, url)
    }

    /// Execute a POST request with an empty body
    pub fn post(self, url: &str) -> Result<Response> {
        self.send(Method::POST, url)
    }

    /// Execute a PUT request with an empty body
    pub fn put(self, url: &str) -> Result<Response> {
        self.send(Method::PUT, url)
    }
}

impl Tether<BodySet> {
    /// Execute a POST request with the body
    pub fn post(self, url: &str) -> Result<Response> {
        self.send(Method::POST, url)
    }

    /// Execute a PUT request with the body
    pub fn put(self, url: &str) -> Result<Response> {
        self.send(Method::PUT, url)
    }

    /// Execute a PATCH request with the body
    pub fn patch(self, url: &str) -> Result<Response> {
        self.send(Method::PATCH, url)
    }
}

impl<S> Tether<S> {
    fn send(self, verb: Method, url: &str) -> Result<Response> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let mut method = HttpMethod::new(verb, url)?;
        method.set_params(self.params);
        for (name, value) in &self.headers {
            method.add_request_header(name, value);
        }
        if let Some(payload) = self.payload {
            method.set_request_entity(ByteArrayEntity::new(
                payload.content,
                payload.content_type.as_deref(),
            ));
        }
        if let Some(follow) = self.follow_redirects {
            method.set_follow_redirects(follow)?;
        }

        let mut client = self.client;
        if let Some(credentials) = self.credentials {
            let target = method
                .uri()
                .ok_or_else(|| error::builder("credentials need an absolute URL"))?;
            let host = target
                .host_str()
                .ok_or_else(|| error::builder("URL has no host").with_url(target.clone()))?;
            let port = target.port_or_known_default().unwrap_or(80);
            client
                .state()
                .set_credentials(AuthScope::for_host(host, port), credentials);
        }
        if self.preemptive {
            client.params_mut().preemptive_auth = vec![CredentialsKind::UsernamePassword];
        }

        if self.debug_enabled {
            tracing::debug!("Tether: {} {}", method.name(), url);
        }
        let status = client.execute_method(&mut method)?;
        if self.debug_enabled {
            tracing::debug!("Tether: {} {} -> {}", method.name(), url, status);
        }
        Ok(Response::new(method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_fails_before_any_io() {
        let client = tether_client::HttpClient::new();
        let err = Tether::with_client(&client)
            .get("not a url")
            .expect_err("invalid url");
        assert!(!err.is_transport());
        assert_eq!(client.stats().snapshot().requests_total, 0);
    }

    #[test]
    fn post_refuses_automatic_redirects() {
        let client = tether_client::HttpClient::new();
        let err = Tether::with_client(&client)
            .follow_redirects(true)
            .text("x")
            .post("http://127.0.0.1:9/")
            .expect_err("redirects refused");
        assert!(err.is_usage());
    }
}
