//! Session and connector traits

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::ServerDescriptor;
use crate::types::{CallOutput, OperationSpec};

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Session is closed")]
    Closed,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// A live bidirectional channel to one tool server
#[async_trait]
pub trait Session: Send + Sync {
    /// Name of the server this session is bound to
    fn server_name(&self) -> &str;

    /// Enumerate the operations the server advertises
    async fn list_operations(&self) -> SessionResult<Vec<OperationSpec>>;

    /// Execute one operation. Exactly one remote call per invocation.
    async fn invoke(&self, name: &str, args: Map<String, Value>) -> SessionResult<CallOutput>;

    /// Close the channel. Later calls fail with [`SessionError::Closed`].
    async fn close(&self) -> SessionResult<()>;
}

/// Establishes sessions from Server Descriptors
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, descriptor: &ServerDescriptor) -> SessionResult<Arc<dyn Session>>;
}
