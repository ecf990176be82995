//! User-facing translation log and the derived progress count.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::resource::StringResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Info,
    Success,
    Warning,
    Error,
}

impl LogType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub log_type: LogType,
    pub message: String,
}

impl LogEntry {
    pub fn new(log_type: LogType, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            log_type,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.log_type.label(),
            self.message
        )
    }
}

/// Append-only log shared by the scheduler and its observers.
///
/// Entries are never edited or removed; `clear` is the only reset.
#[derive(Clone)]
pub struct LogSink {
    entries: Arc<watch::Sender<Arc<Vec<LogEntry>>>>,
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink {
    pub fn new() -> Self {
        let (entries, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(LogType::Info, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(LogType::Success, message.into());
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(LogType::Warning, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(LogType::Error, message.into());
    }

    fn push(&self, log_type: LogType, message: String) {
        match log_type {
            LogType::Info | LogType::Success => info!("{}", message),
            LogType::Warning => warn!("{}", message),
            LogType::Error => error!("{}", message),
        }
        let entry = LogEntry::new(log_type, message);
        self.entries.send_modify(|entries| Arc::make_mut(entries).push(entry));
    }

    pub fn entries(&self) -> Arc<Vec<LogEntry>> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, log_type: LogType) -> usize {
        self.entries.borrow().iter().filter(|e| e.log_type == log_type).count()
    }

    pub fn clear(&self) {
        self.entries.send_replace(Arc::new(Vec::new()));
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<LogEntry>>> {
        self.entries.subscribe()
    }

    /// Whole log as plain text, one entry per line
    pub fn to_text(&self) -> String {
        self.entries
            .borrow()
            .iter()
            .map(LogEntry::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Finished items (translated or errored) over total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn from_resources(resources: &[StringResource]) -> Self {
        Self {
            done: resources.iter().filter(|r| r.is_finished()).count(),
            total: resources.len(),
        }
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.done as f64 / self.total as f64
        }
    }

    pub fn percent(&self) -> u8 {
        (self.ratio() * 100.0).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_insertion_order() {
        let sink = LogSink::new();
        sink.info("first");
        sink.success("second");
        sink.warning("third");
        sink.error("fourth");

        let entries = sink.entries();
        let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third", "fourth"]);
        assert_eq!(entries[2].log_type, LogType::Warning);
        assert_eq!(sink.count(LogType::Success), 1);
    }

    #[test]
    fn test_clear_is_explicit_and_total() {
        let sink = LogSink::new();
        sink.info("a");
        sink.info("b");
        let held = sink.entries();
        sink.clear();
        assert!(sink.is_empty());
        assert_eq!(held.len(), 2);
    }

    #[test]
    fn test_text_format() {
        let sink = LogSink::new();
        sink.error("Translation failed for key 'title'");
        let text = sink.to_text();
        assert!(text.starts_with('['));
        assert!(text.ends_with("ERROR: Translation failed for key 'title'"));
    }

    #[test]
    fn test_clones_share_the_log() {
        let sink = LogSink::new();
        let other = sink.clone();
        other.info("shared");
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_progress_ratio() {
        assert_eq!(Progress::default().ratio(), 0.0);
        let progress = Progress { done: 1, total: 3 };
        assert_eq!(progress.percent(), 33);
        assert_eq!(Progress { done: 3, total: 3 }.percent(), 100);
    }
}
