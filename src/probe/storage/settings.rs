//! Persisted form settings and lifecycle hooks.
//!
//! | Key | Default |
//! |-----|---------|
//! | `host` | `127.0.0.1` |
//! | `port` | `8080` |
//! | `method` | `direct_socket` |
//! | `logs` | empty |

use serde::{Deserialize, Serialize};

use super::traits::SettingsStore;
use crate::probe::journal::LogSink;

pub const HOST_KEY: &str = "host";
pub const PORT_KEY: &str = "port";
pub const METHOD_KEY: &str = "method";
pub const LOGS_KEY: &str = "logs";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: &str = "8080";
pub const DEFAULT_METHOD: &str = "direct_socket";

/// Last submitted form values.
///
/// Stored as raw text so an invalid submission is shown back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSettings {
    pub host: String,
    pub port: String,
    pub method: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT.to_string(),
            method: DEFAULT_METHOD.to_string(),
        }
    }
}

impl ProbeSettings {
    /// Read the settings, falling back to defaults per missing key.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let defaults = Self::default();
        Self {
            host: store.get(HOST_KEY).unwrap_or(defaults.host),
            port: store.get(PORT_KEY).unwrap_or(defaults.port),
            method: store.get(METHOD_KEY).unwrap_or(defaults.method),
        }
    }

    pub fn save(&self, store: &dyn SettingsStore) {
        store.set(HOST_KEY, self.host.clone());
        store.set(PORT_KEY, self.port.clone());
        store.set(METHOD_KEY, self.method.clone());
    }
}

/// Seed missing defaults. Existing values are left alone.
pub fn activate(store: &dyn SettingsStore, sink: &LogSink) {
    let defaults = ProbeSettings::default();
    store.set_if_absent(HOST_KEY, defaults.host);
    store.set_if_absent(PORT_KEY, defaults.port);
    store.set_if_absent(METHOD_KEY, defaults.method);
    store.set_if_absent(LOGS_KEY, String::new());
    sink.info("System health monitor activated");
}

/// Drop the form settings. The journal survives.
pub fn deactivate(store: &dyn SettingsStore, sink: &LogSink) {
    sink.info("System health monitor deactivated");
    store.delete(HOST_KEY);
    store.delete(PORT_KEY);
    store.delete(METHOD_KEY);
}
