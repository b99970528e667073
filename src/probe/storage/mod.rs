//! Settings storage.
//!
//! - `traits`: the [`SettingsStore`] seam
//! - `map_store`: DashMap implementation with optional JSON file backing
//! - `settings`: typed form settings plus activate/deactivate hooks
//! - `log_store`: journal store persisted under the `logs` key

mod log_store;
mod map_store;
mod settings;
mod traits;

pub use log_store::SettingsLogStore;
pub use map_store::DashMapSettingsStore;
pub use settings::{
    DEFAULT_HOST, DEFAULT_METHOD, DEFAULT_PORT, HOST_KEY, LOGS_KEY, METHOD_KEY, PORT_KEY,
    ProbeSettings, activate, deactivate,
};
pub use traits::SettingsStore;
