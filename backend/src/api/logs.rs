//! Job log streaming via Server-Sent Events (SSE).
//!
//! Every job reports its progress through a process-wide broadcast channel.
//! Entries are echoed to stdout and fanned out to SSE subscribers; entries
//! written through a [`JobLog`] carry the job id so clients can filter.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Log level for client display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Optional indentation level (for nested logs)
    #[serde(default)]
    pub indent: u8,
    /// Job the entry belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
            job: None,
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    pub fn for_job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(job.into());
        self
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Broadcasts log entries to all connected SSE clients
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Send a log entry to all subscribers
    pub fn log(&self, entry: LogEntry) {
        let prefix = match entry.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(entry.indent as usize);
        match entry.job {
            Some(ref job) => println!("{}{} [{}] {}", indent, prefix, short_id(job), entry.message),
            None => println!("{}{} {}", indent, prefix, entry.message),
        }

        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    /// Get a receiver for SSE streaming
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

fn short_id(job: &str) -> &str {
    job.get(..8).unwrap_or(job)
}

/// Log handle bound to one job.
#[derive(Debug, Clone)]
pub struct JobLog {
    job: String,
}

impl JobLog {
    pub fn new(job: impl Into<String>) -> Self {
        Self { job: job.into() }
    }

    fn emit(&self, level: LogLevel, msg: impl Into<String>, indent: u8) {
        LOG_BROADCASTER.log(LogEntry::new(level, msg).with_indent(indent).for_job(self.job.clone()));
    }

    pub fn info(&self, msg: impl Into<String>) {
        self.emit(LogLevel::Info, msg, 0);
    }

    pub fn info_indent(&self, msg: impl Into<String>, indent: u8) {
        self.emit(LogLevel::Info, msg, indent);
    }

    pub fn success(&self, msg: impl Into<String>) {
        self.emit(LogLevel::Success, msg, 0);
    }

    pub fn warning(&self, msg: impl Into<String>) {
        self.emit(LogLevel::Warning, msg, 0);
    }

    pub fn error(&self, msg: impl Into<String>) {
        self.emit(LogLevel::Error, msg, 0);
    }
}

/// Convenient logging functions for messages outside any job
pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Error, msg));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_entries_reach_subscribers() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();
        broadcaster.log(LogEntry::new(LogLevel::Success, "done").for_job("1234abcd-ffff"));

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, LogLevel::Success);
        assert_eq!(entry.job.as_deref(), Some("1234abcd-ffff"));
    }

    #[test]
    fn test_entry_serialization_omits_missing_job() {
        let json = serde_json::to_value(LogEntry::new(LogLevel::Info, "hello")).unwrap();
        assert_eq!(json["level"], "info");
        assert!(json.get("job").is_none());
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("1234abcd-ffff"), "1234abcd");
        assert_eq!(short_id("abc"), "abc");
    }
}
