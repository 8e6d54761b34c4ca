//! Logger that discards everything

use super::traits::{Level, Logger};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl NoOpLogger {
    /// Create a new no-op logger
    pub fn new() -> Self {
        Self
    }
}

impl Logger for NoOpLogger {
    fn log(&self, _level: Level, _message: &str) {}
}
