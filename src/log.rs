//! Pluggable message logging.
//!
//! Every component that reports progress or failures takes an
//! `Arc<dyn Logger>`. The default writes tagged lines to stdout; callers can
//! route messages into `tracing` or capture them for inspection.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Time,
}

impl Level {
    /// Maps loose tags such as `"i"`, `"warn"` or `"error"` to a level by
    /// their first letter.
    pub fn from_tag(tag: &str) -> Option<Level> {
        match tag.chars().next()?.to_ascii_lowercase() {
            'i' => Some(Level::Info),
            'w' => Some(Level::Warn),
            'e' => Some(Level::Error),
            't' => Some(Level::Time),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "[Info]"),
            Level::Warn => write!(f, "[Warn]"),
            Level::Error => write!(f, "[Error]"),
            Level::Time => write!(f, "[Time]"),
        }
    }
}

pub trait Logger: Send + Sync {
    fn log(&self, level: Level, msg: &str);

    fn info(&self, msg: &str) {
        self.log(Level::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.log(Level::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.log(Level::Error, msg);
    }

    fn time(&self, msg: &str) {
        self.log(Level::Time, msg);
    }
}

/// Writes `[Level]: message` lines to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutLogger;

impl Logger for StdoutLogger {
    fn log(&self, level: Level, msg: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}: {}", level, msg);
        let _ = out.flush();
    }
}

/// Forwards messages to the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, msg: &str) {
        match level {
            Level::Info => tracing::info!("{}", msg),
            Level::Warn => tracing::warn!("{}", msg),
            Level::Error => tracing::error!("{}", msg),
            Level::Time => tracing::info!(kind = "time", "{}", msg),
        }
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Level, String)> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, msg: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push((level, msg.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_map_by_first_letter() {
        assert_eq!(Level::from_tag("i"), Some(Level::Info));
        assert_eq!(Level::from_tag("Warn"), Some(Level::Warn));
        assert_eq!(Level::from_tag("error"), Some(Level::Error));
        assert_eq!(Level::from_tag("time"), Some(Level::Time));
        assert_eq!(Level::from_tag("x"), None);
        assert_eq!(Level::from_tag(""), None);
    }

    #[test]
    fn level_display() {
        assert_eq!(format!("{}: hi", Level::Error), "[Error]: hi");
    }

    #[test]
    fn memory_logger_captures() {
        let log = MemoryLogger::new();
        log.info("one");
        log.warn("two");
        log.info("three");
        assert_eq!(log.messages(Level::Info), vec!["one", "three"]);
        assert_eq!(log.records().len(), 3);
    }
}
