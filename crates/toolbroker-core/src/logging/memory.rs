//! In-memory logger that records every line

use parking_lot::Mutex;

use super::traits::{Level, Logger};

/// Captures log lines as `LEVEL message` strings
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogger {
    /// Create an empty memory logger
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Whether any captured line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|l| l.contains(needle))
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, message: &str) {
        self.lines.lock().push(format!("{} {}", level, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_records_levels() {
        let logger = MemoryLogger::new();
        logger.info("connected");
        logger.warn("slow server");

        assert_eq!(logger.lines(), vec!["INFO connected", "WARN slow server"]);
        assert!(logger.contains("slow"));
        assert!(!logger.contains("ERROR"));
    }
}
