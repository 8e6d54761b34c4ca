//! Logging abstractions for runtime-agnostic logging
//!
//! The broker never logs as control flow: every line emitted here is a
//! diagnostic. Errors reach callers through return values.

mod traits;
mod noop;
mod console;
mod memory;

pub use traits::{Level, Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use console::{ConsoleLogger, ConsoleTarget};
pub use memory::MemoryLogger;
