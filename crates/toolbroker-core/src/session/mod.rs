//! Sessions: live channels to tool servers
//!
//! The broker only talks to the [`Session`] and [`Connector`] traits.
//! [`StdioConnector`] is the production implementation (MCP over a child
//! process's stdio, via the official `rmcp` SDK); [`MockConnector`] is a
//! deterministic in-memory double.
//!
//! ```rust,ignore
//! use toolbroker_core::session::{Connector, StdioConnector};
//!
//! let connector = StdioConnector::new(logger);
//! let session = connector.connect(&descriptor).await?;
//! let operations = session.list_operations().await?;
//! let output = session.invoke("read_file", args).await?;
//! session.close().await?;
//! ```

mod traits;
mod stdio;
pub mod mock;

pub use traits::{Connector, Session, SessionError, SessionResult};
pub use stdio::{StdioConnector, StdioSession};
pub use mock::{MockConnector, MockReply, MockServer, MockSession};
