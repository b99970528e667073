//! Capacity-capped audit journal shared by every stage of a probe run.
//!
//! # Architecture
//!
//! - [`LogEntry`]: timestamped, leveled message rendered as
//!   `[YYYY-MM-DD HH:MM:SS] [LEVEL] message`. Rendered lines parse back.
//! - [`LogBuffer`]: ordered entries capped at [`LOG_CAPACITY`]; pushing past the
//!   cap evicts from the front so the newest entries survive in order.
//! - [`LogStore`]: storage seam (`push`/`clear`/`entries`). Implementations
//!   lock internally so the sink can be shared across tasks.
//! - [`LogSink`]: the handle every component writes through. Each append is
//!   also emitted as a `tracing` event at the matching level.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Maximum number of entries retained in the journal.
pub const LOG_CAPACITY: usize = 150;

/// Timestamp layout used when rendering entries.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Severity of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Success => write!(f, "SUCCESS"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(LogLevel::Info),
            "SUCCESS" => Ok(LogLevel::Success),
            "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// A single journal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current local time.
    ///
    /// Line breaks in the message are flattened so every entry renders as
    /// exactly one line.
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            timestamp: Local::now().naive_local(),
            level,
            message: message.replace(['\r', '\n'], " "),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level,
            self.message
        )
    }
}

impl FromStr for LogEntry {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let rest = line
            .strip_prefix('[')
            .ok_or_else(|| format!("missing timestamp: {}", line))?;
        let (timestamp, rest) = rest
            .split_once("] [")
            .ok_or_else(|| format!("missing level: {}", line))?;
        let (level, message) = rest
            .split_once(']')
            .ok_or_else(|| format!("unterminated level: {}", line))?;

        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| format!("bad timestamp '{}': {}", timestamp, e))?;

        Ok(Self {
            timestamp,
            level: level.parse()?,
            message: message.strip_prefix(' ').unwrap_or(message).to_string(),
        })
    }
}

/// Ordered entries with oldest-first eviction.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild a buffer from rendered text, skipping lines that do not parse.
    pub fn parse(text: &str, capacity: usize) -> Self {
        let mut buffer = Self::new(capacity);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            if let Ok(entry) = line.parse::<LogEntry>() {
                buffer.push(entry);
            }
        }
        buffer
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// One entry per line, each newline-terminated.
    pub fn render(&self) -> String {
        render_entries(self.entries.iter())
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(LOG_CAPACITY)
    }
}

pub(crate) fn render_entries<'a>(entries: impl Iterator<Item = &'a LogEntry>) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_string());
        out.push('\n');
    }
    out
}

/// Storage seam for journal entries.
///
/// Implementations must be thread-safe (`Send + Sync`) and enforce the
/// capacity cap themselves.
pub trait LogStore: Send + Sync {
    fn push(&self, entry: LogEntry);

    fn clear(&self);

    fn entries(&self) -> Vec<LogEntry>;
}

/// Mutex-guarded in-memory store.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    buffer: Mutex<LogBuffer>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LogBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogStore for MemoryLogStore {
    fn push(&self, entry: LogEntry) {
        self.lock().push(entry);
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn entries(&self) -> Vec<LogEntry> {
        self.lock().entries()
    }
}

/// Write handle for the journal.
pub struct LogSink {
    store: Arc<dyn LogStore>,
}

impl LogSink {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Sink backed by a fresh [`MemoryLogStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLogStore::new()))
    }

    /// Append an entry and mirror it to `tracing`.
    pub fn append(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry::now(level, message);

        match level {
            LogLevel::Info | LogLevel::Success => info!("[{}] {}", level, entry.message),
            LogLevel::Warning => warn!("{}", entry.message),
            LogLevel::Error => error!("{}", entry.message),
        }

        self.store.push(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.append(LogLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.append(LogLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.append(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.append(LogLevel::Error, message);
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.store.entries()
    }

    pub fn len(&self) -> usize {
        self.store.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the journal, one entry per line in insertion order.
    pub fn snapshot(&self) -> String {
        render_entries(self.store.entries().iter())
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::in_memory()
    }
}
