//! Journal persisted through the settings store.
//!
//! The rendered journal text is written under the `logs` key after every
//! mutation and parsed back on construction, so the journal survives
//! restarts when the settings store is file-backed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::settings::LOGS_KEY;
use super::traits::SettingsStore;
use crate::probe::journal::{LOG_CAPACITY, LogBuffer, LogEntry, LogStore};

pub struct SettingsLogStore {
    store: Arc<dyn SettingsStore>,
    buffer: Mutex<LogBuffer>,
}

impl SettingsLogStore {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        let text = store.get(LOGS_KEY).unwrap_or_default();
        Self {
            buffer: Mutex::new(LogBuffer::parse(&text, LOG_CAPACITY)),
            store,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LogBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, buffer: &LogBuffer) {
        self.store.set(LOGS_KEY, buffer.render());
    }
}

impl LogStore for SettingsLogStore {
    fn push(&self, entry: LogEntry) {
        let mut buffer = self.lock();
        buffer.push(entry);
        self.persist(&buffer);
    }

    fn clear(&self) {
        let mut buffer = self.lock();
        buffer.clear();
        self.persist(&buffer);
    }

    fn entries(&self) -> Vec<LogEntry> {
        self.lock().entries()
    }
}
