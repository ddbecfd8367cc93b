//! Integration tests for the request → dispatch → envelope flow over HTTP.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::TestServer;
use gantry::{Command, FnModuleSource, ModuleCatalog};
use serde_json::{json, Map, Value};

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[tokio::test]
async fn echo_round_trip() {
    let server = TestServer::spawn(46601, ModuleCatalog::new())
        .await
        .expect("failed to spawn test server");
    let client = server.client();

    let envelope = client
        .execute("echo_message", params(json!({"message": "hi"})))
        .await
        .expect("request failed");

    assert!(envelope.success);
    assert_eq!(envelope.command, "echo_message");
    assert_eq!(envelope.return_value, json!("hi"));
    assert!(envelope.message.is_none());
    assert!(!envelope.time.is_empty());

    assert!(client.is_host_online().await);
}

#[tokio::test]
async fn unknown_command_reports_failure() {
    let server = TestServer::spawn(46602, ModuleCatalog::new())
        .await
        .expect("failed to spawn test server");

    let envelope = server
        .client()
        .execute("foo", Map::new())
        .await
        .expect("request failed");

    assert!(!envelope.success);
    assert_eq!(envelope.command, "foo");
    assert_eq!(envelope.return_value, Value::Null);
    assert!(envelope.message.unwrap().contains("foo"));
}

#[tokio::test]
async fn missing_argument_never_invokes_the_callable() {
    let fired = Arc::new(AtomicBool::new(false));
    let probe = Arc::clone(&fired);
    let mut catalog = ModuleCatalog::new();
    catalog.insert(Arc::new(FnModuleSource::new("fx", move || {
        let probe = Arc::clone(&probe);
        Ok(vec![Command::from_fn(
            "detonate",
            &["charge", "fuse"],
            move |_| {
                probe.store(true, Ordering::SeqCst);
                Ok(Value::Null)
            },
        )])
    })));

    let server = TestServer::spawn(46603, catalog)
        .await
        .expect("failed to spawn test server");
    server.context().load_module("fx", false).unwrap();

    let envelope = server
        .client()
        .execute("detonate", params(json!({"charge": 1})))
        .await
        .expect("request failed");

    assert!(!envelope.success);
    assert!(envelope.message.unwrap().contains("fuse"));
    assert!(!fired.load(Ordering::SeqCst), "callable must not run");
}

#[tokio::test]
async fn malformed_body_yields_parse_failure_envelope() {
    let server = TestServer::spawn(46604, ModuleCatalog::new())
        .await
        .expect("failed to spawn test server");

    let response = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/", server.port()))
        .body("this is not json")
        .send()
        .await
        .expect("request failed");
    assert!(response.status().is_success());

    let envelope: gantry::proto::Envelope = response.json().await.expect("bad envelope");
    assert!(!envelope.success);
    assert!(envelope.message.unwrap().contains("malformed request"));
}

#[tokio::test]
async fn shutdown_stops_the_accept_loop() {
    let server = TestServer::spawn(46605, ModuleCatalog::new())
        .await
        .expect("failed to spawn test server");
    let client = server.client();

    assert!(server.context().is_running());
    let envelope = client
        .execute("shutdown", Map::new())
        .await
        .expect("request failed");
    assert!(envelope.success);

    assert!(!server.context().is_running());
    server.join().await.expect("accept loop never exited");
}
