//! Drives the real server binary through the broker's stdio connector

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::tempdir;
use toolbroker_core::{Broker, BrokerConfig, BrokerError, MemoryLogger, ServerDescriptor};

const SERVER_BIN: &str = env!("CARGO_BIN_EXE_toolbroker-server");

fn descriptor(name: &str, cwd: &Path) -> ServerDescriptor {
    ServerDescriptor::new(name, SERVER_BIN)
        .with_cwd(cwd)
        .with_env("SEARCH_API_KEY", "")
}

fn broker(servers: Vec<ServerDescriptor>) -> Broker {
    let config = BrokerConfig::new(servers).with_call_timeout_ms(30_000);
    Broker::stdio(config, Arc::new(MemoryLogger::new())).unwrap()
}

#[tokio::test]
async fn test_connect_invoke_disconnect() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), "first\nsecond\nthird").unwrap();

    let mut broker = broker(vec![descriptor("repo-tools", dir.path())]);
    let report = broker.connect().await;
    assert!(report.is_complete(), "{:?}", report.failures);
    assert_eq!(broker.session_count(), 1);

    let operations = broker.list_operations();
    for name in ["get_repo_stats", "read_file", "list_directory", "count_lines", "web_search"] {
        assert!(operations.iter().any(|op| op == name), "missing {}", name);
    }
    let read_file = broker.describe("read_file").unwrap();
    assert!(read_file.input_schema["properties"]["file_path"].is_object());

    let text = broker
        .invoke("read_file", json!({"file_path": "notes.txt", "max_lines": 2}))
        .await
        .unwrap();
    let file: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(file["content"], json!("first\nsecond"));
    assert_eq!(file["total_lines"], json!(3));
    assert_eq!(file["truncated"], json!(true));

    let listing = broker.invoke("list_directory", Value::Null).await.unwrap();
    assert_eq!(listing, "notes.txt");

    let missing = broker.invoke("read_file", json!({"file_path": "absent.txt"})).await.unwrap();
    assert_eq!(missing, "File not found: absent.txt");

    let hint = broker.invoke("web_search", json!({"query": "rust"})).await.unwrap();
    assert!(hint.contains("SEARCH_API_KEY not configured"));

    let failures = broker.disconnect().await;
    assert!(failures.is_empty());
    assert!(matches!(
        broker.invoke("read_file", json!({"file_path": "notes.txt"})).await,
        Err(BrokerError::SessionClosed { .. })
    ));
}

#[tokio::test]
async fn test_invalid_arguments_are_remote_failures() {
    let dir = tempdir().unwrap();
    let mut broker = broker(vec![descriptor("repo-tools", dir.path())]);
    broker.connect().await;

    let err = broker
        .invoke("read_file", json!({"file_path": "a", "max_lines": 0}))
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::RemoteInvocationFailure { .. }), "{:?}", err);

    let err = broker.invoke("no_such_tool", json!({})).await.unwrap_err();
    assert!(matches!(err, BrokerError::UnknownOperation(_)));

    broker.disconnect().await;
}

#[tokio::test]
async fn test_broken_server_is_isolated() {
    let dir = tempdir().unwrap();
    let mut broker = broker(vec![
        ServerDescriptor::new("broken", "/nonexistent/tool-server"),
        descriptor("repo-tools", dir.path()),
    ]);

    let report = broker.connect().await;
    assert_eq!(report.connected, vec!["repo-tools"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].server, "broken");
    assert!(broker.list_operations().iter().any(|op| op == "count_lines"));

    broker.disconnect().await;
}

#[tokio::test]
async fn test_two_servers_last_write_wins() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    fs::write(second.path().join("only-here.txt"), "x").unwrap();

    let mut broker = broker(vec![descriptor("first", first.path()), descriptor("second", second.path())]);
    broker.connect().await;

    assert_eq!(broker.session_count(), 2);
    assert_eq!(broker.describe("list_directory").unwrap().server(), "second");
    let listing = broker.invoke("list_directory", json!({})).await.unwrap();
    assert_eq!(listing, "only-here.txt");

    broker.disconnect().await;
}

#[tokio::test]
async fn test_silent_process_does_not_stall_connect() {
    let dir = tempdir().unwrap();
    let config = BrokerConfig::new(vec![
        ServerDescriptor::new("silent", "sleep").with_args(["30"]),
        descriptor("repo-tools", dir.path()),
    ])
    .with_connect_timeout_ms(5_000);
    let mut broker = Broker::stdio(config, Arc::new(MemoryLogger::new())).unwrap();

    let report = tokio::time::timeout(Duration::from_secs(20), broker.connect())
        .await
        .expect("connect must be bounded");
    assert_eq!(report.connected, vec!["repo-tools"]);
    assert_eq!(report.failures[0].server, "silent");
    assert!(matches!(report.failures[0].error, BrokerError::ConnectionFailure { .. }));
    assert!(broker.list_operations().iter().any(|op| op == "read_file"));

    broker.disconnect().await;
}
