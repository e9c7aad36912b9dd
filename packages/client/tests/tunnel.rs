//! Requests through a proxy: absolute-form forwarding and CONNECT tunnels

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use tether_client::auth::{AuthScheme, decode_basic_auth};
use tether_client::connect::PlainSocketFactory;
use tether_client::{
    AuthScope, ClientParams, Credentials, CredentialsProvider, HostConfiguration, HttpClient, HttpMethod,
    MethodParams, Protocol,
};

use support::{RecordedRequest, Reply, ScriptedServer};

/// A secure scheme whose "secure" layer is plain TCP, so the tunnelled
/// exchange stays readable by the scripted proxy.
fn register_tunnel_scheme() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        Protocol::register(Protocol::new("stunnel", 443, true, Arc::new(PlainSocketFactory)));
    });
}

fn proxied_client(proxy: &ScriptedServer) -> HttpClient {
    HttpClient::new()
        .with_host_configuration(HostConfiguration::new().with_proxy("127.0.0.1", proxy.port()))
}

fn proxy_authorized(request: &RecordedRequest) -> bool {
    request
        .header("Proxy-Authorization")
        .and_then(decode_basic_auth)
        .is_some_and(|(user, pass)| user == "proxy-user" && pass == "proxy-pass")
}

const PROXY_CHALLENGE: &str = "HTTP/1.1 407 Proxy Authentication Required\r\n\
    Proxy-Authenticate: Basic realm=\"gateway\"\r\nContent-Length: 7\r\n\r\nno pass";

#[test]
fn connect_tunnel_carries_origin_form_request() {
    support::init_tracing();
    register_tunnel_scheme();
    let proxy = ScriptedServer::start(|_, request| match request.method() {
        "CONNECT" => Reply::send("HTTP/1.1 200 Connection established\r\n\r\n"),
        "GET" => Reply::ok("through the tunnel"),
        other => panic!("unexpected {other:?}"),
    });
    let client = proxied_client(&proxy);

    let mut method = HttpMethod::get("stunnel://origin.test/secret?k=v").expect("method");
    assert_eq!(client.execute_method(&mut method).expect("execute"), 200);
    assert_eq!(method.response_body_as_string().expect("body"), "through the tunnel");

    let requests = proxy.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].request_line, "CONNECT origin.test:443 HTTP/1.1");
    assert_eq!(requests[0].header("Host"), Some("origin.test:443"));
    assert_eq!(requests[1].request_line, "GET /secret?k=v HTTP/1.1");
    assert_eq!(requests[1].header("Host"), Some("origin.test"));
    assert_eq!(proxy.connection_count(), 1);
    assert_eq!(client.stats().snapshot().tunnels, 1);
}

#[test]
fn refused_tunnel_reports_the_proxy_response() {
    register_tunnel_scheme();
    let proxy = ScriptedServer::start(|_, _| Reply::send(PROXY_CHALLENGE));
    let client = proxied_client(&proxy);

    let mut method = HttpMethod::get("stunnel://origin.test/").expect("method");
    let err = client.execute_method(&mut method).expect_err("tunnel refused");

    assert!(err.is_tunnel_refused(), "unexpected {err:?}");
    let response = err.proxy_response().expect("proxy response kept");
    assert_eq!(response.status_code(), 407);
    assert_eq!(response.body().as_ref(), b"no pass");
    assert_eq!(
        response.header("Proxy-Authenticate").map(|h| h.value()),
        Some("Basic realm=\"gateway\"")
    );
    assert_eq!(proxy.request_count(), 1);
}

#[test]
fn proxy_challenge_is_answered_before_tunnelling() {
    register_tunnel_scheme();
    let proxy = ScriptedServer::start(|_, request| match request.method() {
        "CONNECT" if proxy_authorized(request) => {
            Reply::send("HTTP/1.1 200 Connection established\r\n\r\n")
        }
        "CONNECT" => Reply::send(PROXY_CHALLENGE),
        _ => Reply::ok("origin"),
    });
    let client = proxied_client(&proxy);
    client.state().set_proxy_credentials(
        AuthScope::for_host("127.0.0.1", proxy.port()),
        Credentials::username_password("proxy-user", "proxy-pass"),
    );

    let mut method = HttpMethod::get("stunnel://origin.test/").expect("method");
    assert_eq!(client.execute_method(&mut method).expect("execute"), 200);

    let requests = proxy.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].header("Proxy-Authorization").is_none());
    assert!(proxy_authorized(&requests[1]));
    assert!(
        requests[2].header("Proxy-Authorization").is_none(),
        "proxy credentials leaked into the tunnel"
    );
    assert_eq!(proxy.connection_count(), 1);
}

#[test]
fn plain_proxy_receives_absolute_form() {
    let proxy = ScriptedServer::start(|_, _| Reply::ok("forwarded"));
    let client = proxied_client(&proxy);

    let mut method = HttpMethod::get("http://origin.test:8080/page?q=1").expect("method");
    assert_eq!(client.execute_method(&mut method).expect("execute"), 200);
    assert_eq!(method.response_body_as_string().expect("body"), "forwarded");

    let request = &proxy.requests()[0];
    assert_eq!(request.request_line, "GET http://origin.test:8080/page?q=1 HTTP/1.1");
    assert_eq!(request.header("Host"), Some("origin.test:8080"));
}

#[test]
fn preemptive_proxy_credentials_on_plain_proxy() {
    let proxy = ScriptedServer::start(|_, request| {
        if proxy_authorized(request) {
            Reply::ok("forwarded")
        } else {
            Reply::send(PROXY_CHALLENGE)
        }
    });
    let client = proxied_client(&proxy)
        .with_params(ClientParams::new().with_preemptive_authentication(true));
    client.state().set_proxy_credentials(
        AuthScope::for_host("127.0.0.1", proxy.port()),
        Credentials::username_password("proxy-user", "proxy-pass"),
    );

    let mut method = HttpMethod::get("http://origin.test/").expect("method");
    assert_eq!(client.execute_method(&mut method).expect("execute"), 200);
    assert_eq!(proxy.request_count(), 1);
}

#[test]
fn plain_proxy_challenge_is_answered() {
    let proxy = ScriptedServer::start(|_, request| {
        if proxy_authorized(request) {
            Reply::ok("forwarded")
        } else {
            Reply::send(PROXY_CHALLENGE)
        }
    });
    let client = proxied_client(&proxy);
    client.state().set_proxy_credentials(
        AuthScope::for_host("127.0.0.1", proxy.port()),
        Credentials::username_password("proxy-user", "proxy-pass"),
    );

    let mut method = HttpMethod::get("http://origin.test/").expect("method");
    assert_eq!(client.execute_method(&mut method).expect("execute"), 200);
    assert_eq!(proxy.request_count(), 2);
    assert!(method.proxy_auth_state().is_auth_attempted());
}

/// Hands out a different password on every prompt.
#[derive(Debug, Default)]
struct RotatingPasswords {
    prompts: AtomicUsize,
}

impl CredentialsProvider for RotatingPasswords {
    fn get_credentials(
        &self,
        _scheme: &dyn AuthScheme,
        _host: &str,
        _port: u16,
        _proxy: bool,
    ) -> Option<Credentials> {
        let n = self.prompts.fetch_add(1, Ordering::SeqCst);
        Some(Credentials::username_password("proxy-user", format!("guess-{n}")))
    }
}

#[test]
fn tunnel_authentication_attempts_are_bounded() {
    register_tunnel_scheme();
    let proxy = ScriptedServer::start(|_, request| match request.method() {
        "CONNECT" => Reply::send(PROXY_CHALLENGE),
        other => panic!("unexpected {other:?}"),
    });
    let provider = Arc::new(RotatingPasswords::default());
    let client = proxied_client(&proxy).with_params(
        ClientParams::new()
            .with_max_tunnel_auth_attempts(3)
            .with_method_params(MethodParams::new().with_credentials_provider(provider.clone())),
    );

    let mut method = HttpMethod::get("stunnel://origin.test/").expect("method");
    let err = client.execute_method(&mut method).expect_err("proxy never accepts");

    assert!(err.is_tunnel_refused(), "unexpected {err:?}");
    assert_eq!(err.proxy_response().expect("proxy response kept").status_code(), 407);
    assert_eq!(proxy.request_count(), 4);
    assert_eq!(provider.prompts.load(Ordering::SeqCst), 3);
    assert!(proxy.requests()[1..].iter().all(proxy_has_credentials));
}

fn proxy_has_credentials(request: &RecordedRequest) -> bool {
    request.header("Proxy-Authorization").is_some()
}
