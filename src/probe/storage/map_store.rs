//! DashMap-based settings storage.
//!
//! Lock-free in-memory map, optionally mirrored to a JSON file. The file is
//! read once on construction and rewritten after every mutation. Write
//! failures are logged and otherwise ignored; the in-memory map stays
//! authoritative.
//!
//! Snapshot and write happen under one writer lock, so concurrent mutations
//! cannot leave an older snapshot on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use super::traits::SettingsStore;

pub struct DashMapSettingsStore {
    values: DashMap<String, String>,
    path: Option<PathBuf>,
    writer: Mutex<()>,
}

impl DashMapSettingsStore {
    /// Create an empty, memory-only store.
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
            path: None,
            writer: Mutex::new(()),
        }
    }

    /// Create a store backed by the JSON file at `path`.
    ///
    /// A missing file starts empty. An unreadable or malformed file is logged
    /// and also starts empty; it is overwritten on the first mutation.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let loaded = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, String>>(&text) {
                Ok(map) => {
                    debug!("Loaded {} settings from {}", map.len(), path.display());
                    map
                }
                Err(e) => {
                    warn!("Ignoring malformed settings file {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Settings file {} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                warn!("Failed to read settings file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        Self {
            values: loaded.into_iter().collect(),
            path: Some(path),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        // Sorted keys keep the file diff-friendly.
        let map: BTreeMap<String, String> = self
            .values
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let result = serde_json::to_string_pretty(&map)
            .map_err(std::io::Error::other)
            .and_then(|json| fs::write(path, json));
        if let Err(e) = result {
            warn!("Failed to write settings file {}: {}", path.display(), e);
        }
    }
}

impl Default for DashMapSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for DashMapSettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
        self.persist();
    }

    fn delete(&self, key: &str) -> Option<String> {
        let removed = self.values.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    fn set_if_absent(&self, key: &str, value: String) -> bool {
        let inserted = match self.values.entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        };
        if inserted {
            self.persist();
        }
        inserted
    }
}
