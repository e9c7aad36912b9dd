//! Connection manager capacity, waiting and reclamation

mod support;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tether_client::config::ConnectionManagerParams;
use tether_client::{
    ClientParams, HostConfiguration, HttpClient, HttpConnectionManager, HttpMethod, MultiThreadedConnectionManager,
    SimpleConnectionManager, Url,
};

use support::{Reply, ScriptedServer};

fn config(host: &str) -> HostConfiguration {
    HostConfiguration::for_url(&Url::parse(host).expect("test URL should parse"))
        .expect("host configuration")
}

fn manager(per_host: usize, total: usize) -> MultiThreadedConnectionManager {
    MultiThreadedConnectionManager::with_params(
        ConnectionManagerParams::new()
            .with_max_connections_per_host(per_host)
            .with_max_total_connections(total),
    )
    .expect("valid manager params")
}

#[test]
fn saturated_host_times_out_with_pool_timeout() {
    support::init_tracing();
    let manager = manager(1, 20);
    let host = config("http://pool-a.test:8080");

    let held = manager
        .get_connection(&host, Some(Duration::from_millis(50)))
        .expect("first checkout");
    let started = Instant::now();
    let err = manager
        .get_connection(&host, Some(Duration::from_millis(50)))
        .expect_err("second checkout must time out");
    let waited = started.elapsed();

    assert!(err.is_pool_timeout(), "unexpected {err:?}");
    assert!(!err.is_timeout());
    assert!(waited >= Duration::from_millis(50), "returned after {waited:?}");
    assert!(waited < Duration::from_secs(2), "returned after {waited:?}");
    drop(held);
}

#[test]
fn waiter_is_woken_by_release() {
    let manager = Arc::new(manager(1, 20));
    let host = config("http://pool-b.test");

    let held = manager.get_connection(&host, None).expect("first checkout");
    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        drop(held);
    });

    let started = Instant::now();
    let conn = manager
        .get_connection(&host, Some(Duration::from_secs(5)))
        .expect("released connection handed over");
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(!conn.is_fresh());
    releaser.join().expect("releaser thread");
}

#[test]
fn capacity_caps_hold_under_concurrency() {
    let manager = Arc::new(manager(2, 3));
    let hosts = [config("http://cap-a.test"), config("http://cap-b.test")];

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let manager = Arc::clone(&manager);
            let host = hosts[i % 2].clone();
            let hosts = hosts.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    let conn = manager
                        .get_connection(&host, Some(Duration::from_secs(10)))
                        .expect("checkout");
                    for h in &hosts {
                        assert!(manager.connections_in_pool(h) <= 2);
                    }
                    assert!(manager.connections_in_pool_total() <= 3);
                    thread::sleep(Duration::from_millis(1));
                    drop(conn);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker thread");
    }
    assert_eq!(manager.connections_in_use(&hosts[0]), 0);
    assert_eq!(manager.connections_in_use(&hosts[1]), 0);
}

#[test]
fn free_connection_of_other_host_is_evicted_at_global_cap() {
    let manager = manager(1, 1);
    let a = config("http://evict-a.test");
    let b = config("http://evict-b.test");

    drop(manager.get_connection(&a, None).expect("checkout a"));
    assert_eq!(manager.connections_in_pool(&a), 1);

    let conn = manager
        .get_connection(&b, Some(Duration::from_millis(200)))
        .expect("checkout b by evicting a");
    assert!(conn.is_fresh());
    assert_eq!(manager.connections_in_pool(&a), 0);
    assert_eq!(manager.connections_in_pool(&b), 1);
}

#[test]
fn shutdown_refuses_checkouts() {
    let manager = manager(2, 20);
    manager.shutdown();
    let err = manager
        .get_connection(&config("http://down.test"), None)
        .expect_err("shut down");
    assert!(err.is_usage());
    assert!(manager.is_shutdown());
}

#[test]
fn single_connection_manager_refuses_second_checkout() {
    let manager = SimpleConnectionManager::new(false);
    let host = config("http://single.test");
    let held = manager.get_connection(&host, None).expect("first checkout");

    let err = manager
        .get_connection(&host, None)
        .expect_err("already checked out");
    assert!(err.is_usage());

    drop(held);
    manager.get_connection(&host, None).expect("checkout after release");
}

#[test]
fn keep_alive_connection_is_reused_across_methods() {
    let server = ScriptedServer::start(|_, _| Reply::ok("pong"));
    let client = HttpClient::new();

    for _ in 0..3 {
        let mut method = HttpMethod::get(&server.url("/ping")).expect("method");
        assert_eq!(client.execute_method(&mut method).expect("execute"), 200);
        assert_eq!(method.response_body_as_string().expect("body"), "pong");
    }

    assert_eq!(server.request_count(), 3);
    assert_eq!(server.connection_count(), 1);
}

#[test]
fn unread_body_holds_the_connection_until_released() {
    let server = ScriptedServer::start(|_, _| Reply::ok("payload"));
    let manager = Arc::new(manager(1, 1));
    let client = HttpClient::with_manager(manager.clone()).with_params(
        ClientParams::new().with_connection_manager_timeout(Duration::from_millis(100)),
    );
    let host = config(&server.url("/"));

    let mut first = HttpMethod::get(&server.url("/a")).expect("method");
    client.execute_method(&mut first).expect("first execute");
    assert!(first.has_pending_body());
    assert_eq!(manager.connections_in_use(&host), 1);

    let mut second = HttpMethod::get(&server.url("/b")).expect("method");
    let err = client
        .execute_method(&mut second)
        .expect_err("pool exhausted while body unread");
    assert!(err.is_pool_timeout(), "unexpected {err:?}");

    first.release_connection();
    assert_eq!(manager.connections_in_use(&host), 0);
    let mut third = HttpMethod::get(&server.url("/c")).expect("method");
    assert_eq!(client.execute_method(&mut third).expect("third execute"), 200);
    assert_eq!(server.connection_count(), 1);
}

#[test]
fn abandoned_lease_is_reclaimed_and_late_release_closes_it() {
    let manager = MultiThreadedConnectionManager::with_params(
        ConnectionManagerParams::new()
            .with_max_connections_per_host(1)
            .with_max_total_connections(1)
            .with_abandoned_grace(Duration::from_millis(100))
            .with_maintenance_interval(Duration::from_millis(20)),
    )
    .expect("valid manager params");
    let host = config("http://reclaim.test");

    let leaked = manager.get_connection(&host, None).expect("first checkout");
    let second = manager
        .get_connection(&host, Some(Duration::from_secs(5)))
        .expect("capacity reclaimed from the idle lease");
    assert!(second.is_fresh());
    assert_eq!(manager.connections_in_pool(&host), 1);
    assert_eq!(manager.connections_in_use(&host), 1);

    drop(leaked);
    assert_eq!(manager.connections_in_pool(&host), 1);
    assert_eq!(manager.connections_in_pool_total(), 1);
    drop(second);
}

#[test]
fn idle_connections_are_closed_and_deleted() {
    let server = ScriptedServer::start(|_, _| Reply::ok("idle"));
    let manager = Arc::new(manager(2, 20));
    let client = HttpClient::with_manager(manager.clone());

    let mut method = HttpMethod::get(&server.url("/idle")).expect("method");
    client.execute_method(&mut method).expect("execute");
    assert_eq!(method.response_body_as_string().expect("body"), "idle");
    assert_eq!(manager.connections_in_pool_total(), 1);

    thread::sleep(Duration::from_millis(30));
    manager.close_idle_connections(Duration::from_millis(10));
    manager.delete_closed_connections();
    assert_eq!(manager.connections_in_pool_total(), 0);
    assert_eq!(manager.connections_in_pool(&config(&server.url("/"))), 0);
}

#[test]
fn maintenance_thread_sweeps_idle_connections() {
    let server = ScriptedServer::start(|_, _| Reply::ok("swept"));
    let manager = Arc::new(
        MultiThreadedConnectionManager::with_params(
            ConnectionManagerParams::new()
                .with_idle_timeout(Duration::from_millis(50))
                .with_maintenance_interval(Duration::from_millis(20)),
        )
        .expect("valid manager params"),
    );
    let client = HttpClient::with_manager(manager.clone());

    let mut method = HttpMethod::get(&server.url("/sweep")).expect("method");
    client.execute_method(&mut method).expect("execute");
    assert_eq!(method.response_body_as_string().expect("body"), "swept");

    let deadline = Instant::now() + Duration::from_secs(5);
    while manager.connections_in_pool_total() > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(manager.connections_in_pool_total(), 0);
}
