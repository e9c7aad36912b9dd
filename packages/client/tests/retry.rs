//! Recovery from dropped connections

mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tether_client::{
    DefaultMethodRetryHandler, Error, HttpClient, HttpMethod, MethodParams, MethodRetryHandler,
};

use support::{Reply, ScriptedServer};

fn quick_retries(count: u32) -> MethodParams {
    MethodParams::new().with_retry_handler(Arc::new(
        DefaultMethodRetryHandler::new(count, false).with_backoff_base(Duration::ZERO),
    ))
}

#[test]
fn dropped_connections_are_retried_until_a_response_arrives() {
    support::init_tracing();
    let server = ScriptedServer::start(|index, _| {
        if index < 2 { Reply::Drop } else { Reply::ok("third time lucky") }
    });
    let client = HttpClient::new();

    let mut method = HttpMethod::get(&server.url("/flaky")).expect("method");
    method.set_params(quick_retries(3));
    assert_eq!(client.execute_method(&mut method).expect("execute"), 200);
    assert_eq!(method.response_body_as_string().expect("body"), "third time lucky");

    assert_eq!(server.request_count(), 3);
    assert_eq!(server.connection_count(), 3);
    let stats = client.stats().snapshot();
    assert_eq!(stats.retries, 2);
    assert_eq!(stats.requests_successful, 1);
}

#[test]
fn retry_budget_runs_out() {
    let server = ScriptedServer::start(|_, _| Reply::Drop);
    let client = HttpClient::new();

    let mut method = HttpMethod::get(&server.url("/dead")).expect("method");
    method.set_params(quick_retries(2));
    let err = client.execute_method(&mut method).expect_err("never answers");

    assert!(err.is_no_response(), "unexpected {err:?}");
    assert!(err.is_transport());
    assert_eq!(server.request_count(), 3);
    assert_eq!(client.stats().snapshot().requests_failed, 1);
}

#[test]
fn protocol_violations_are_not_retried() {
    let server = ScriptedServer::start(|_, _| Reply::close("SMTP ready\r\n"));
    let client = HttpClient::new();

    let mut method = HttpMethod::get(&server.url("/wrong-service")).expect("method");
    method.set_params(quick_retries(5));
    let err = client.execute_method(&mut method).expect_err("not http");

    assert!(err.is_protocol(), "unexpected {err:?}");
    assert_eq!(server.request_count(), 1);
    assert_eq!(client.stats().snapshot().retries, 0);
}

#[test]
fn stale_pooled_connection_is_replaced_transparently() {
    let server = ScriptedServer::start(|index, _| {
        if index == 0 {
            Reply::close("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
        } else {
            Reply::ok("fresh")
        }
    });
    let client = HttpClient::new();

    let mut first = HttpMethod::get(&server.url("/one")).expect("method");
    client.execute_method(&mut first).expect("first execute");
    assert_eq!(first.response_body_as_string().expect("body"), "ok");
    // Let the server's FIN arrive before the next checkout probes the socket.
    std::thread::sleep(Duration::from_millis(50));

    let mut second = HttpMethod::get(&server.url("/two")).expect("method");
    second.set_params(quick_retries(1));
    assert_eq!(client.execute_method(&mut second).expect("second execute"), 200);
    assert_eq!(second.response_body_as_string().expect("body"), "fresh");
    assert_eq!(server.connection_count(), 2);
}

#[derive(Debug, Default)]
struct Counting {
    calls: AtomicU32,
}

impl MethodRetryHandler for Counting {
    fn retry_method(&self, _method: &HttpMethod, error: &Error, execution_count: u32) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        error.is_no_response() && execution_count < 2
    }

    fn backoff(&self, _execution_count: u32) -> Duration {
        Duration::ZERO
    }
}

#[test]
fn custom_handler_decides_each_retry() {
    let server = ScriptedServer::start(|_, _| Reply::Drop);
    let client = HttpClient::new();
    let handler = Arc::new(Counting::default());

    let mut method = HttpMethod::get(&server.url("/custom")).expect("method");
    method.set_params(MethodParams::new().with_retry_handler(handler.clone()));
    let err = client.execute_method(&mut method).expect_err("gives up");

    assert!(err.is_no_response(), "unexpected {err:?}");
    assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    assert_eq!(server.request_count(), 2);
}

#[test]
fn aborted_method_is_not_retried() {
    let server = ScriptedServer::start(|_, _| Reply::Stall(Duration::from_secs(3)));
    let client = HttpClient::new();

    let mut method = HttpMethod::get(&server.url("/stalled")).expect("method");
    method.set_params(quick_retries(5));
    let handle = method.abort_handle();
    let aborter = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        handle.abort();
    });

    let started = std::time::Instant::now();
    let err = client.execute_method(&mut method).expect_err("aborted");
    assert!(started.elapsed() < Duration::from_secs(3), "abort did not interrupt the read");
    assert!(err.is_transport(), "unexpected {err:?}");
    assert!(method.is_aborted());
    assert_eq!(server.request_count(), 1);
    aborter.join().expect("aborter thread");

    let err = client
        .execute_method(&mut method)
        .expect_err("aborted methods cannot run again");
    assert!(err.is_usage());
}
