//! Console logger implementation

use super::traits::{Level, Logger};

/// Where a `ConsoleLogger` sends its non-error lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    /// debug/warn/error to stderr, info to stdout
    Mixed,
    /// Everything to stderr. Required inside a stdio tool server, where
    /// stdout carries the protocol.
    Stderr,
}

/// A logger that outputs to the console
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    prefix: String,
    target: ConsoleTarget,
    verbose: bool,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    /// Create a new console logger with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "[toolbroker]".to_string(),
            target: ConsoleTarget::Mixed,
            verbose: false,
        }
    }

    /// Create a console logger with a custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::new()
        }
    }

    /// Send every line to stderr
    pub fn stderr(mut self) -> Self {
        self.target = ConsoleTarget::Stderr;
        self
    }

    /// Emit debug lines too
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug if !self.verbose => {}
            Level::Info if self.target == ConsoleTarget::Mixed => {
                println!("{} {}: {}", self.prefix, level, message)
            }
            _ => eprintln!("{} {}: {}", self.prefix, level, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_logger_creation() {
        let logger = ConsoleLogger::new();
        assert_eq!(logger.prefix, "[toolbroker]");
        assert_eq!(logger.target, ConsoleTarget::Mixed);

        let custom = ConsoleLogger::with_prefix("[repo-tools]").stderr();
        assert_eq!(custom.prefix, "[repo-tools]");
        assert_eq!(custom.target, ConsoleTarget::Stderr);
    }
}
