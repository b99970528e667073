//! Outbound reachability probe.
//!
//! This module is organized into the following submodules:
//!
//! - `target`: host/port validation
//! - `types`: transport modes and user-facing outcomes
//! - `error`: error type and connect-error classification
//! - `config`: configuration resolution with environment variable support
//! - `journal`: bounded, timestamped diagnostic log
//! - `exec`: policy-gated command execution capability
//! - `transport`: connection strategies (`shell_redirect` is feature-gated)
//! - `relay`: bounded read/execute/write session over an established stream
//! - `resolver`: mode to strategy mapping and `try_all` fallback
//! - `orchestrator`: validate, resolve and report a single run
//! - `storage`: persisted settings and journal
//! - `service`: wiring shared by the binaries
//! - `admin`: poem HTTP routes

pub mod admin;
pub mod config;
pub mod error;
pub mod exec;
pub mod journal;
pub mod orchestrator;
pub mod relay;
pub mod resolver;
pub mod service;
pub mod storage;
pub mod target;
pub mod transport;
pub mod types;

pub use config::ProbeConfig;
pub use error::ProbeError;
pub use service::ProbeService;
pub use types::{TransportMode, UserOutcome};
