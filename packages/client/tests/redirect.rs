//! Redirect following, loop detection and the hop budget

mod support;

use tether_client::{HttpClient, HttpMethod, MethodParams, StringEntity};

use support::{Reply, ScriptedServer};

fn found(location: &str) -> Reply {
    Reply::send(format!(
        "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 5\r\n\r\nmoved"
    ))
}

#[test]
fn relative_location_is_followed_on_the_same_connection() {
    support::init_tracing();
    let server = ScriptedServer::start(|_, request| match request.target() {
        "/old" => found("/new?from=old"),
        "/new?from=old" => Reply::ok("arrived"),
        other => panic!("unexpected {other:?}"),
    });
    let client = HttpClient::new();

    let mut method = HttpMethod::get(&server.url("/old")).expect("method");
    assert_eq!(client.execute_method(&mut method).expect("execute"), 200);
    assert_eq!(method.path(), "/new");
    assert_eq!(method.query(), Some("from=old"));
    assert_eq!(method.response_body_as_string().expect("body"), "arrived");
    assert_eq!(server.connection_count(), 1);
    assert_eq!(client.stats().snapshot().redirects, 1);
}

#[test]
fn redirect_to_another_host_switches_connection() {
    let target = ScriptedServer::start(|_, _| Reply::ok("other host"));
    let location = target.url("/landing");
    let origin = ScriptedServer::start(move |_, _| found(&location));
    let client = HttpClient::new();

    let mut method = HttpMethod::get(&origin.url("/start")).expect("method");
    assert_eq!(client.execute_method(&mut method).expect("execute"), 200);
    assert_eq!(method.response_body_as_string().expect("body"), "other host");
    assert_eq!(origin.request_count(), 1);
    assert_eq!(target.request_count(), 1);
    assert_eq!(
        method.uri().map(|u| u.port()),
        Some(Some(target.port()))
    );
}

#[test]
fn hop_budget_is_enforced() {
    let server = ScriptedServer::start(|index, _| found(&format!("/hop{}", index + 1)));
    let client = HttpClient::new();

    let mut method = HttpMethod::get(&server.url("/start")).expect("method");
    method.set_params(MethodParams::new().with_max_redirects(3));
    let err = client.execute_method(&mut method).expect_err("too many redirects");

    assert!(err.is_redirect(), "unexpected {err:?}");
    assert!(err.to_string().contains("3"), "unexpected message {err}");
    assert_eq!(server.request_count(), 3);
}

#[test]
fn circular_redirect_is_detected_ignoring_query() {
    let server = ScriptedServer::start(|index, request| {
        if request.target().starts_with("/a") {
            found("/b")
        } else {
            found(&format!("/a?visit={index}"))
        }
    });
    let client = HttpClient::new();

    let mut method = HttpMethod::get(&server.url("/a?visit=start")).expect("method");
    let err = client.execute_method(&mut method).expect_err("loop detected");
    assert!(err.is_redirect(), "unexpected {err:?}");
    assert_eq!(err.url().map(|u| u.path()), Some("/a"));
    assert_eq!(server.request_count(), 2);
}

#[test]
fn allowed_circular_redirects_still_run_out_of_budget() {
    let server = ScriptedServer::start(|_, request| {
        if request.target() == "/ping" {
            found("/pong")
        } else {
            found("/ping")
        }
    });
    let client = HttpClient::new();

    let mut method = HttpMethod::get(&server.url("/ping")).expect("method");
    method.set_params(
        MethodParams::new()
            .with_allow_circular_redirects(true)
            .with_max_redirects(5),
    );
    let err = client.execute_method(&mut method).expect_err("budget exhausted");
    assert!(err.is_redirect(), "unexpected {err:?}");
    assert_eq!(server.request_count(), 5);
}

#[test]
fn entity_enclosing_method_returns_the_redirect() {
    let server = ScriptedServer::start(|_, _| found("/elsewhere"));
    let client = HttpClient::new();

    let mut method = HttpMethod::post(&server.url("/submit")).expect("method");
    method.set_request_entity(StringEntity::new("a=1", Some("application/x-www-form-urlencoded"), None));
    assert!(method.set_follow_redirects(true).is_err());

    assert_eq!(client.execute_method(&mut method).expect("execute"), 302);
    assert_eq!(
        method.response_header("Location").map(|h| h.value()),
        Some("/elsewhere")
    );
    assert_eq!(server.request_count(), 1);
    assert_eq!(server.requests()[0].body, b"a=1");
}

#[test]
fn redirect_without_location_is_returned() {
    let server = ScriptedServer::start(|_, _| {
        Reply::send("HTTP/1.1 302 Found\r\nContent-Length: 0\r\n\r\n")
    });
    let client = HttpClient::new();

    let mut method = HttpMethod::get(&server.url("/nowhere")).expect("method");
    assert_eq!(client.execute_method(&mut method).expect("execute"), 302);
    assert_eq!(server.request_count(), 1);
}

#[test]
fn relative_location_can_be_rejected() {
    let server = ScriptedServer::start(|_, _| found("/relative"));
    let client = HttpClient::new();

    let mut method = HttpMethod::get(&server.url("/strict")).expect("method");
    method.set_params(MethodParams::new().with_reject_relative_redirect(true));
    assert_eq!(client.execute_method(&mut method).expect("execute"), 302);
    assert_eq!(server.request_count(), 1);
}

#[test]
fn disabled_following_returns_the_redirect() {
    let server = ScriptedServer::start(|_, _| found("/next"));
    let client = HttpClient::new();

    let mut method = HttpMethod::get(&server.url("/manual")).expect("method");
    method.set_follow_redirects(false).expect("GET may opt out");
    assert_eq!(client.execute_method(&mut method).expect("execute"), 302);
    assert_eq!(method.response_body_as_string().expect("body"), "moved");
}
