//! MCP server for a [`ToolSet`], built on rmcp's `ServerHandler`
//!
//! rmcp owns framing, the handshake and request routing. This module maps
//! `tools/list` and `tools/call` onto the tool set. Logs go to stderr only.

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, InitializeRequestParams, InitializeResult,
    ListToolsResult, PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, ServerInitializeError};
use rmcp::{ErrorData, RoleServer, ServerHandler, ServiceExt};
use thiserror::Error;

use toolbroker_core::logging::SharedLogger;
use toolbroker_core::{log_debug, log_error, log_info, log_warn};

use crate::tools::{ToolError, ToolSet};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("MCP handshake failed: {0}")]
    Initialize(#[from] ServerInitializeError),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub struct ToolServer {
    info: Implementation,
    tools: ToolSet,
    logger: SharedLogger,
}

impl ToolServer {
    /// Create a server advertising `name`/`version` for `tools`
    pub fn new(name: impl Into<String>, version: impl Into<String>, tools: ToolSet, logger: SharedLogger) -> Self {
        Self {
            info: Implementation {
                name: name.into(),
                title: None,
                version: version.into(),
                icons: None,
                website_url: None,
            },
            tools,
            logger,
        }
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Serve stdin/stdout until the client goes away
    pub async fn serve_stdio(self) -> Result<(), ServeError> {
        let logger = self.logger.clone();
        log_info!(logger, "{} MCP server running on stdio ({} tools)", self.info.name, self.tools.len());

        let running = self.serve(rmcp::transport::stdio()).await?;
        let reason = running.waiting().await?;
        log_debug!(logger, "Server stopped: {:?}", reason);
        Ok(())
    }

    fn reject(&self, error: ToolError) -> ErrorData {
        log_warn!(self.logger, "{}", error);
        ErrorData::invalid_params(error.to_string(), None)
    }
}

impl ServerHandler for ToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: self.info.clone(),
            instructions: None,
        }
    }

    /// Answers with the client's protocol version
    async fn initialize(
        &self,
        request: InitializeRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, ErrorData> {
        log_info!(self.logger, "Client connected: {}", request.client_info.name);

        let mut info = self.get_info();
        info.protocol_version = request.protocol_version.clone();
        if context.peer.peer_info().is_none() {
            context.peer.set_peer_info(request);
        }
        Ok(info)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools.definitions()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let name = request.name.to_string();
        let args = request.arguments.unwrap_or_default();
        log_debug!(self.logger, "tools/call {}", name);

        let tool = self
            .tools
            .get(&name)
            .cloned()
            .ok_or_else(|| self.reject(ToolError::UnknownTool(name.clone())))?;

        // A panicking tool must still get an answer to the client
        let output = match tokio::spawn(async move { tool.call(args).await }).await {
            Ok(result) => result.map_err(|e| self.reject(e))?,
            Err(e) => {
                log_error!(self.logger, "{} aborted: {}", name, e);
                return Err(ErrorData::internal_error(format!("{} aborted: {}", name, e), None));
            }
        };

        let content = vec![Content::text(output.text)];
        Ok(if output.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        })
    }
}
