//! MCP sessions over a child process's stdio, using the official rmcp SDK

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, ClientCapabilities, ClientInfo, Content, Implementation, RawContent, Tool},
    service::{Peer, RunningService},
    transport::TokioChildProcess,
    RoleClient, ServiceExt,
};
use serde_json::{Map, Value};
use tokio::process::Command;
use tokio::sync::Mutex;

use super::traits::{Connector, Session, SessionError, SessionResult};
use crate::config::ServerDescriptor;
use crate::logging::SharedLogger;
use crate::types::{CallOutput, ContentPart, OperationSpec};

/// Spawns each server as a child process and performs the MCP handshake
pub struct StdioConnector {
    logger: SharedLogger,
}

impl StdioConnector {
    /// Create a connector that logs through `logger`
    pub fn new(logger: SharedLogger) -> Self {
        Self { logger }
    }

    fn command_for(descriptor: &ServerDescriptor) -> Command {
        let mut cmd = Command::new(&descriptor.command);
        cmd.args(&descriptor.args);

        // Inherit the ambient environment, overrides win
        if let Some(env) = &descriptor.env {
            cmd.envs(env);
        }
        if let Some(cwd) = &descriptor.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    fn client_info() -> ClientInfo {
        ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "toolbroker".to_string(),
                title: Some("Toolbroker".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
        }
    }
}

#[async_trait]
impl Connector for StdioConnector {
    async fn connect(&self, descriptor: &ServerDescriptor) -> SessionResult<Arc<dyn Session>> {
        self.logger.debug(&format!(
            "[StdioConnector] Spawning {}: {} {}",
            descriptor.name,
            descriptor.command,
            descriptor.args.join(" ")
        ));

        let transport = TokioChildProcess::new(Self::command_for(descriptor))
            .map_err(|e| SessionError::ConnectionFailed(format!("{}: {}", descriptor.command, e)))?;

        let service = Self::client_info()
            .serve(transport)
            .await
            .map_err(|e| SessionError::InitializationFailed(e.to_string()))?;

        if let Some(info) = service.peer_info() {
            self.logger.debug(&format!(
                "[StdioConnector] {} initialized ({} {})",
                descriptor.name, info.server_info.name, info.server_info.version
            ));
        }

        Ok(Arc::new(StdioSession::new(&descriptor.name, service, self.logger.clone())))
    }
}

/// A running MCP client session bound to one server process
pub struct StdioSession {
    server: String,
    /// Request handle, cloned out of the running service
    peer: Peer<RoleClient>,
    /// Taken on close; cancelling it terminates the child
    service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
    closed: AtomicBool,
    logger: SharedLogger,
}

impl StdioSession {
    fn new(server: &str, service: RunningService<RoleClient, ClientInfo>, logger: SharedLogger) -> Self {
        Self {
            server: server.to_string(),
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            closed: AtomicBool::new(false),
            logger,
        }
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }
}

fn operation_from_tool(tool: Tool) -> OperationSpec {
    OperationSpec {
        name: tool.name.to_string(),
        description: tool.description.map(|s| s.to_string()).unwrap_or_default(),
        // input_schema is Arc<JsonObject>, convert to Value
        input_schema: serde_json::to_value(tool.input_schema.as_ref()).unwrap_or_default(),
    }
}

fn part_from_content(content: &Content) -> ContentPart {
    // Content is Annotated<RawContent>; only the raw payload matters here
    match &content.raw {
        RawContent::Text(t) => ContentPart::Text(t.text.clone()),
        other => {
            let data = serde_json::to_value(other).unwrap_or(Value::Null);
            let kind = data
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            ContentPart::Other { kind, data }
        }
    }
}

#[async_trait]
impl Session for StdioSession {
    fn server_name(&self) -> &str {
        &self.server
    }

    async fn list_operations(&self) -> SessionResult<Vec<OperationSpec>> {
        self.ensure_open()?;

        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|e| SessionError::Protocol(e.to_string()))?;

        self.logger.debug(&format!("[StdioSession] {} listed {} tools", self.server, tools.len()));

        Ok(tools.into_iter().map(operation_from_tool).collect())
    }

    async fn invoke(&self, name: &str, args: Map<String, Value>) -> SessionResult<CallOutput> {
        self.ensure_open()?;

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: Some(args),
            task: None,
        };

        let result = self
            .peer
            .call_tool(params)
            .await
            .map_err(|e| SessionError::ToolCallFailed(e.to_string()))?;

        Ok(CallOutput {
            parts: result.content.iter().map(part_from_content).collect(),
            is_error: result.is_error.unwrap_or(false),
        })
    }

    async fn close(&self) -> SessionResult<()> {
        self.closed.store(true, Ordering::SeqCst);

        let Some(service) = self.service.lock().await.take() else {
            return Ok(());
        };

        self.logger.debug(&format!("[StdioSession] Closing {}", self.server));
        service
            .cancel()
            .await
            .map_err(|e| SessionError::Protocol(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[tokio::test]
    async fn test_connect_missing_binary_fails() {
        let connector = StdioConnector::new(Arc::new(NoOpLogger::new()));
        let descriptor = ServerDescriptor::new("ghost", "/nonexistent/toolbroker-test-binary");

        let result = connector.connect(&descriptor).await;
        assert!(matches!(
            result,
            Err(SessionError::ConnectionFailed(_)) | Err(SessionError::InitializationFailed(_))
        ));
    }

    #[test]
    fn test_operation_from_tool() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": { "file_path": { "type": "string" } }
        });
        let Value::Object(object) = schema.clone() else { unreachable!() };
        let tool = Tool::new("read_file", "Read a file", Arc::new(object));

        let spec = operation_from_tool(tool);
        assert_eq!(spec.name, "read_file");
        assert_eq!(spec.description, "Read a file");
        assert_eq!(spec.input_schema, schema);
    }
}
