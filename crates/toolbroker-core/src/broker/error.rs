//! Broker error taxonomy

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the broker
#[derive(Error, Debug)]
pub enum BrokerError {
    /// A configured server could not be started or reached
    #[error("failed to connect to server '{server}': {reason}")]
    ConnectionFailure { server: String, reason: String },

    /// Connected, but listing the server's operations failed
    #[error("operation discovery failed for server '{server}': {reason}")]
    DiscoveryFailure { server: String, reason: String },

    /// Rejected by `CollisionPolicy::Reject`
    #[error("operation '{operation}' from server '{server}' collides with server '{existing}'")]
    NameCollision {
        operation: String,
        existing: String,
        server: String,
    },

    /// No operation with this name is registered
    #[error("unknown operation: '{0}'")]
    UnknownOperation(String),

    /// Arguments were not a JSON object
    #[error("invalid arguments for '{operation}': {reason}")]
    InvalidArguments { operation: String, reason: String },

    /// The owning server failed while executing the call
    #[error("operation '{operation}' failed on server '{server}': {reason}")]
    RemoteInvocationFailure {
        operation: String,
        server: String,
        reason: String,
    },

    /// The owning session was disconnected
    #[error("session for server '{server}' is closed (operation '{operation}')")]
    SessionClosed { operation: String, server: String },

    #[error("operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("operation '{0}' was cancelled")]
    Cancelled(String),

    /// Closing a session failed during disconnect
    #[error("failed to close session for server '{server}': {reason}")]
    CloseFailure { server: String, reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl BrokerError {
    /// Whether this error came from a call reaching (or timing out on) a server
    pub fn is_invocation_failure(&self) -> bool {
        matches!(
            self,
            BrokerError::RemoteInvocationFailure { .. } | BrokerError::Timeout { .. }
        )
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;

/// A per-server failure recorded during connect or disconnect
#[derive(Debug)]
pub struct ServerFailure {
    pub server: String,
    pub error: BrokerError,
}

impl ServerFailure {
    pub fn new(server: impl Into<String>, error: BrokerError) -> Self {
        Self {
            server: server.into(),
            error,
        }
    }
}
