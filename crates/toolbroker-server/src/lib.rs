//! Toolbroker Server
//!
//! A stdio MCP tool server exposing repository (GitHub), filesystem and web
//! search tools. Any MCP client can use it; `toolbroker-core`'s broker is the
//! intended one.
//!
//! ```rust,ignore
//! use toolbroker_server::{ToolServer, ToolSet};
//!
//! let server = ToolServer::new("repo-tools", "0.1.0", ToolSet::standard(), logger);
//! server.serve_stdio().await?;
//! ```

pub mod server;
pub mod tools;

pub use server::{ServeError, ToolServer};
pub use tools::{Tool, ToolError, ToolOutput, ToolSet};
