//! Shared types for discovery and dispatch

mod operation;
mod content;
mod cancellation;

pub use operation::OperationSpec;
pub use content::{CallOutput, ContentPart, Invocation, NO_OUTPUT};
pub use cancellation::CancellationToken;
