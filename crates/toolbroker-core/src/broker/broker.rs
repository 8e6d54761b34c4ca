//! The Broker: connects servers, owns the registry, dispatches calls

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use super::error::{BrokerError, BrokerResult, ServerFailure};
use super::registry::{OperationRecord, OperationRegistry, SessionHandle};
use crate::config::{BrokerConfig, ServerDescriptor};
use crate::logging::SharedLogger;
use crate::session::{Connector, SessionError, StdioConnector};
use crate::types::{CancellationToken, Invocation};
use crate::{log_info, log_warn};

/// Outcome of [`Broker::connect`], for diagnostics
#[derive(Debug, Default)]
pub struct ConnectReport {
    /// Servers that yielded a session, in connection order
    pub connected: Vec<String>,
    /// Registry size after connecting
    pub operations: usize,
    /// Servers (or single operations) that could not be brought up
    pub failures: Vec<ServerFailure>,
}

impl ConnectReport {
    /// True when every server connected and registered cleanly
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Tool broker over any number of tool servers
///
/// `connect` and `disconnect` take `&mut self`; `invoke` takes `&self`, so
/// calls can run concurrently but never overlap a registry mutation.
pub struct Broker {
    config: BrokerConfig,
    connector: Arc<dyn Connector>,
    logger: SharedLogger,
    /// Insertion order; a reconnect appends a second handle for the same server
    sessions: Vec<Arc<SessionHandle>>,
    registry: OperationRegistry,
    /// operation → server, for operations whose session was disconnected
    retired: HashMap<String, String>,
    next_session_id: u64,
}

impl Broker {
    /// Create a broker over `connector`. Fails if the configuration is invalid.
    pub fn new(config: BrokerConfig, connector: Arc<dyn Connector>, logger: SharedLogger) -> BrokerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            connector,
            logger,
            sessions: Vec::new(),
            registry: OperationRegistry::new(),
            retired: HashMap::new(),
            next_session_id: 1,
        })
    }

    /// Create a broker that launches servers as child processes over stdio
    pub fn stdio(config: BrokerConfig, logger: SharedLogger) -> BrokerResult<Self> {
        let connector = Arc::new(StdioConnector::new(logger.clone()));
        Self::new(config, connector, logger)
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Connect every configured server in order and merge its operations.
    ///
    /// Best effort: a server that fails to start or to list its operations, or
    /// does not answer within [`BrokerConfig::connect_timeout`], is logged and
    /// recorded in the report, and the remaining servers are still attempted.
    /// Meant to be called once per broker; a second call opens new sessions
    /// and re-points every rediscovered name to them.
    pub async fn connect(&mut self) -> ConnectReport {
        let mut report = ConnectReport::default();
        let servers = self.config.servers.clone();

        for descriptor in &servers {
            let Some(handle) = self.open_session(descriptor, &mut report).await else {
                continue;
            };
            self.discover(&handle, &mut report).await;
        }

        report.operations = self.registry.len();
        log_info!(
            self.logger,
            "Connected to {} server(s), {} operation(s) available",
            self.sessions.len(),
            self.registry.len()
        );
        report
    }

    async fn open_session(
        &mut self,
        descriptor: &ServerDescriptor,
        report: &mut ConnectReport,
    ) -> Option<Arc<SessionHandle>> {
        let limit = self.config.connect_timeout();
        let outcome = match tokio::time::timeout(limit, self.connector.connect(descriptor)).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("no response within {}ms", limit.as_millis())),
        };

        match outcome {
            Ok(session) => {
                let handle = Arc::new(SessionHandle::new(self.next_session_id, &descriptor.name, session));
                self.next_session_id += 1;
                self.sessions.push(handle.clone());
                report.connected.push(descriptor.name.clone());
                Some(handle)
            }
            Err(reason) => {
                log_warn!(self.logger, "Failed to connect to {}: {}", descriptor.name, reason);
                report.failures.push(ServerFailure::new(
                    &descriptor.name,
                    BrokerError::ConnectionFailure {
                        server: descriptor.name.clone(),
                        reason,
                    },
                ));
                None
            }
        }
    }

    async fn discover(&mut self, handle: &Arc<SessionHandle>, report: &mut ConnectReport) {
        // The handle stays in `sessions` either way so disconnect closes it
        let limit = self.config.connect_timeout();
        let outcome = match tokio::time::timeout(limit, handle.session().list_operations()).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("no response within {}ms", limit.as_millis())),
        };
        let specs = match outcome {
            Ok(specs) => specs,
            Err(reason) => {
                log_warn!(self.logger, "Failed to list operations of {}: {}", handle.server(), reason);
                report.failures.push(ServerFailure::new(
                    handle.server(),
                    BrokerError::DiscoveryFailure {
                        server: handle.server().to_string(),
                        reason,
                    },
                ));
                return;
            }
        };

        for spec in &specs {
            log_info!(self.logger, "  {}/{}: {}", handle.server(), spec.name, spec.description);
        }

        let (registered, collisions) = self.registry.merge(handle, specs, self.config.collision_policy);
        for name in &registered {
            self.retired.remove(name);
        }
        for collision in collisions {
            log_warn!(self.logger, "{}", collision);
            report.failures.push(ServerFailure::new(handle.server(), collision));
        }
    }

    /// Close every session in insertion order, then clear the registry.
    ///
    /// Each close is attempted even if an earlier one failed. Operations that
    /// were registered stay known as closed, so a later `invoke` on them
    /// fails with `SessionClosed` instead of touching a dead channel.
    pub async fn disconnect(&mut self) -> Vec<ServerFailure> {
        let mut failures = Vec::new();

        for handle in self.sessions.drain(..) {
            handle.mark_closed();
            match handle.session().close().await {
                Ok(()) => log_info!(self.logger, "Disconnected from {}", handle.server()),
                Err(e) => {
                    log_warn!(self.logger, "Failed to close {}: {}", handle.server(), e);
                    failures.push(ServerFailure::new(
                        handle.server(),
                        BrokerError::CloseFailure {
                            server: handle.server().to_string(),
                            reason: e.to_string(),
                        },
                    ));
                }
            }
        }

        for record in self.registry.clear() {
            let server = record.server().to_string();
            self.retired.insert(record.name, server);
        }

        failures
    }

    // ─── Dispatch ────────────────────────────────────────────────────────

    /// Call an operation and return its normalized text.
    ///
    /// `args` must be a JSON object, or `null` for no arguments.
    pub async fn invoke(&self, name: &str, args: Value) -> BrokerResult<String> {
        self.call(name, args).await.map(|invocation| invocation.text)
    }

    /// Like [`Broker::invoke`], returning the owning server and the tool's error flag
    pub async fn call(&self, name: &str, args: Value) -> BrokerResult<Invocation> {
        self.dispatch(name, args, None).await
    }

    /// Like [`Broker::call`], abandoning the call when `cancel` fires
    pub async fn call_with_cancel(
        &self,
        name: &str,
        args: Value,
        cancel: &CancellationToken,
    ) -> BrokerResult<Invocation> {
        self.dispatch(name, args, Some(cancel)).await
    }

    async fn dispatch(
        &self,
        name: &str,
        args: Value,
        cancel: Option<&CancellationToken>,
    ) -> BrokerResult<Invocation> {
        let record = self.resolve(name)?;
        let args = into_arguments(name, args)?;

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(BrokerError::Cancelled(name.to_string()));
        }

        let call = self.remote_call(record, args);
        let output = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(BrokerError::Cancelled(name.to_string())),
                output = call => output?,
            },
            None => call.await?,
        };

        if output.is_error {
            log_warn!(self.logger, "{} reported an error from {}", record.server(), name);
        }

        Ok(Invocation {
            operation: record.name.clone(),
            server: record.server().to_string(),
            text: output.normalize(),
            is_error: output.is_error,
        })
    }

    /// One remote call, bounded by the configured timeout
    async fn remote_call(
        &self,
        record: &OperationRecord,
        args: Map<String, Value>,
    ) -> BrokerResult<crate::types::CallOutput> {
        let call = record.handle().session().invoke(&record.remote_name, args);

        let result = match self.config.call_timeout_ms {
            Some(timeout_ms) => match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(BrokerError::Timeout {
                        operation: record.name.clone(),
                        timeout_ms,
                    })
                }
            },
            None => call.await,
        };

        result.map_err(|e| match e {
            SessionError::Closed => BrokerError::SessionClosed {
                operation: record.name.clone(),
                server: record.server().to_string(),
            },
            other => BrokerError::RemoteInvocationFailure {
                operation: record.name.clone(),
                server: record.server().to_string(),
                reason: other.to_string(),
            },
        })
    }

    fn resolve(&self, name: &str) -> BrokerResult<&OperationRecord> {
        if let Some(record) = self.registry.get(name) {
            if record.handle().is_closed() {
                return Err(BrokerError::SessionClosed {
                    operation: name.to_string(),
                    server: record.server().to_string(),
                });
            }
            return Ok(record);
        }

        match self.retired.get(name) {
            Some(server) => Err(BrokerError::SessionClosed {
                operation: name.to_string(),
                server: server.clone(),
            }),
            None => Err(BrokerError::UnknownOperation(name.to_string())),
        }
    }

    // ─── Introspection ───────────────────────────────────────────────────

    /// Registered operation names in discovery order
    pub fn list_operations(&self) -> Vec<String> {
        self.registry.names()
    }

    /// The record behind one operation name
    pub fn describe(&self, name: &str) -> Option<&OperationRecord> {
        self.registry.get(name)
    }

    /// Every registered record in discovery order
    pub fn operations(&self) -> &[OperationRecord] {
        self.registry.records()
    }

    pub fn operation_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of live session handles
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Server names with a live session, in connection order
    pub fn connected_servers(&self) -> Vec<String> {
        self.sessions.iter().map(|h| h.server().to_string()).collect()
    }
}

fn into_arguments(operation: &str, args: Value) -> BrokerResult<Map<String, Value>> {
    match args {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(BrokerError::InvalidArguments {
            operation: operation.to_string(),
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
