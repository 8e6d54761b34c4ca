//! Broker: operation discovery and dispatch across tool servers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Broker                                     │
//! │                                             │
//! │  - Connects each configured server          │
//! │  - Merges tools/list into one registry      │
//! │  - Routes invoke(name) to the owning server │
//! │  - Normalizes results to text               │
//! └─────────────────────────────────────────────┘
//!           │
//!           │ MCP (tools/list, tools/call)
//!           ▼
//! ┌───────────────┐  ┌───────────────┐
//! │  server A     │  │  server B     │
//! └───────────────┘  └───────────────┘
//! ```

mod broker;
mod error;
mod registry;

pub use broker::{Broker, ConnectReport};
pub use error::{BrokerError, BrokerResult, ServerFailure};
pub use registry::{OperationRecord, OperationRegistry, SessionHandle};
