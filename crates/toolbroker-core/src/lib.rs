//! Toolbroker Core
//!
//! Discovers the operations exposed by a set of MCP tool servers and
//! dispatches calls to whichever server owns each one. Callers see a flat
//! namespace of operations and get plain text back.
//!
//! ```rust,ignore
//! use toolbroker_core::{Broker, BrokerConfig, ConsoleLogger};
//!
//! let config = BrokerConfig::load(BrokerConfig::default_path())?;
//! let mut broker = Broker::stdio(config, Arc::new(ConsoleLogger::new()))?;
//! broker.connect().await;
//!
//! for name in broker.list_operations() {
//!     println!("{}", name);
//! }
//!
//! let text = broker.invoke("get_repo_stats", json!({})).await?;
//! broker.disconnect().await;
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod session;
pub mod broker;

// Re-export commonly used types
pub use types::{OperationSpec, CallOutput, ContentPart, Invocation, CancellationToken, NO_OUTPUT};

pub use logging::{Level, Logger, SharedLogger, NoOpLogger, ConsoleLogger, MemoryLogger};

pub use config::{BrokerConfig, CollisionPolicy, ServerDescriptor, ConfigError};

pub use session::{Connector, Session, SessionError, StdioConnector};

pub use broker::{Broker, BrokerError, BrokerResult, ConnectReport, ServerFailure, OperationRecord};
