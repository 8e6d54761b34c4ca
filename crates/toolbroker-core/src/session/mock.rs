//! In-memory sessions for testing
//!
//! Scripted tool lists and replies, no processes or network. Each
//! `connect` builds a fresh [`MockSession`] from the server's script, and the
//! connector keeps every session it handed out so tests can inspect traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::traits::{Connector, Session, SessionError, SessionResult};
use crate::config::ServerDescriptor;
use crate::types::{CallOutput, OperationSpec};

/// Scripted reply for one operation
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this output
    Output(CallOutput),
    /// Fail the remote call with this message
    Fail(String),
    /// Return the output after a delay
    Delayed(Duration, CallOutput),
    /// Echo the received arguments back as JSON text
    EchoArgs,
}

/// Script for one mock server
#[derive(Debug, Clone, Default)]
pub struct MockServer {
    operations: Vec<OperationSpec>,
    replies: HashMap<String, MockReply>,
    refuse_connection: Option<String>,
    fail_discovery: Option<String>,
    fail_close: Option<String>,
    connect_delay: Option<Duration>,
    discovery_delay: Option<Duration>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise an operation that echoes its arguments
    pub fn with_operation(mut self, name: &str, description: &str) -> Self {
        self.operations.push(OperationSpec::new(name, description));
        self.replies.entry(name.to_string()).or_insert(MockReply::EchoArgs);
        self
    }

    /// Script the reply for an advertised operation
    pub fn with_reply(mut self, name: &str, reply: MockReply) -> Self {
        self.replies.insert(name.to_string(), reply);
        self
    }

    /// Make every connection attempt fail
    pub fn refusing(mut self, reason: &str) -> Self {
        self.refuse_connection = Some(reason.to_string());
        self
    }

    /// Connect fine, but fail `list_operations`
    pub fn failing_discovery(mut self, reason: &str) -> Self {
        self.fail_discovery = Some(reason.to_string());
        self
    }

    /// Hold every connection attempt for `delay` before answering
    pub fn slow_to_connect(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    /// Hold `list_operations` for `delay` before answering
    pub fn slow_to_list(mut self, delay: Duration) -> Self {
        self.discovery_delay = Some(delay);
        self
    }

    /// Connect fine, but fail `close`
    pub fn failing_close(mut self, reason: &str) -> Self {
        self.fail_close = Some(reason.to_string());
        self
    }
}

/// A scripted session
pub struct MockSession {
    server: String,
    script: MockServer,
    calls: AtomicUsize,
    received: Mutex<Vec<(String, Map<String, Value>)>>,
    closed: AtomicBool,
    close_attempts: AtomicUsize,
}

impl MockSession {
    pub fn new(server: &str, script: MockServer) -> Self {
        Self {
            server: server.to_string(),
            script,
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            close_attempts: AtomicUsize::new(0),
        }
    }

    /// Number of `invoke` calls that reached this session
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every `(operation, args)` pair received, in order
    pub fn received(&self) -> Vec<(String, Map<String, Value>)> {
        self.received.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close_attempts(&self) -> usize {
        self.close_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for MockSession {
    fn server_name(&self) -> &str {
        &self.server
    }

    async fn list_operations(&self) -> SessionResult<Vec<OperationSpec>> {
        if let Some(delay) = self.script.discovery_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &self.script.fail_discovery {
            return Err(SessionError::Protocol(reason.clone()));
        }
        Ok(self.script.operations.clone())
    }

    async fn invoke(&self, name: &str, args: Map<String, Value>) -> SessionResult<CallOutput> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push((name.to_string(), args.clone()));

        match self.script.replies.get(name) {
            Some(MockReply::Output(output)) => Ok(output.clone()),
            Some(MockReply::Fail(message)) => Err(SessionError::ToolCallFailed(message.clone())),
            Some(MockReply::Delayed(delay, output)) => {
                tokio::time::sleep(*delay).await;
                Ok(output.clone())
            }
            Some(MockReply::EchoArgs) => Ok(CallOutput::text(format!(
                "{}:{}",
                self.server,
                Value::Object(args)
            ))),
            None => Err(SessionError::ToolCallFailed(format!("unknown tool: {}", name))),
        }
    }

    async fn close(&self) -> SessionResult<()> {
        self.close_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.script.fail_close {
            return Err(SessionError::Protocol(reason.clone()));
        }
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector that serves scripted sessions by server name
#[derive(Default)]
pub struct MockConnector {
    servers: HashMap<String, MockServer>,
    sessions: Mutex<Vec<Arc<MockSession>>>,
    attempts: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, name: &str, server: MockServer) -> Self {
        self.servers.insert(name.to_string(), server);
        self
    }

    /// Every session handed out so far, in connection order
    pub fn sessions(&self) -> Vec<Arc<MockSession>> {
        self.sessions.lock().clone()
    }

    /// Server names passed to `connect`, in order
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }

    /// Total calls across every session
    pub fn total_calls(&self) -> usize {
        self.sessions.lock().iter().map(|s| s.call_count()).sum()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, descriptor: &ServerDescriptor) -> SessionResult<Arc<dyn Session>> {
        self.attempts.lock().push(descriptor.name.clone());

        let script = self
            .servers
            .get(&descriptor.name)
            .ok_or_else(|| SessionError::ConnectionFailed(format!("{}: command not found", descriptor.command)))?;

        if let Some(delay) = script.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &script.refuse_connection {
            return Err(SessionError::ConnectionFailed(reason.clone()));
        }

        let session = Arc::new(MockSession::new(&descriptor.name, script.clone()));
        self.sessions.lock().push(session.clone());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn test_mock_session_echo_and_counts() {
        let session = MockSession::new("files", MockServer::new().with_operation("read_file", "Read"));
        assert_eq!(session.server_name(), "files");

        let output = session.invoke("read_file", args(json!({"file_path": "a.txt"}))).await.unwrap();
        assert_eq!(output.normalize(), r#"files:{"file_path":"a.txt"}"#);
        assert_eq!(session.call_count(), 1);
        assert_eq!(session.received()[0].0, "read_file");
    }

    #[tokio::test]
    async fn test_mock_session_closed_rejects_calls() {
        let session = MockSession::new("files", MockServer::new().with_operation("read_file", "Read"));
        session.close().await.unwrap();

        let result = session.invoke("read_file", Map::new()).await;
        assert!(matches!(result, Err(SessionError::Closed)));
        assert_eq!(session.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_connector_refuses_unknown_server() {
        let connector = MockConnector::new();
        let result = connector.connect(&ServerDescriptor::new("ghost", "ghost-bin")).await;
        assert!(matches!(result, Err(SessionError::ConnectionFailed(_))));
        assert_eq!(connector.attempts(), vec!["ghost"]);
    }
}
