//! Shared value types for probe runs and the admin surface.
//!
//! Request and response types implement `Serialize`/`Deserialize` so the
//! admin endpoints can exchange them as JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ProbeError;

/// Transport selection requested for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Plain timed TCP connect
    DirectSocket,
    /// Explicitly resolved TCP connect with `TCP_NODELAY`
    StreamSocket,
    /// Detached shell process; no relay session
    ShellRedirect,
    /// Direct, then stream, then shell redirect; stops at first success
    TryAll,
}

impl TransportMode {
    /// Order in which `TryAll` attempts the concrete strategies.
    pub const FALLBACK_ORDER: [TransportMode; 3] = [
        TransportMode::DirectSocket,
        TransportMode::StreamSocket,
        TransportMode::ShellRedirect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::DirectSocket => "direct_socket",
            TransportMode::StreamSocket => "stream_socket",
            TransportMode::ShellRedirect => "shell_redirect",
            TransportMode::TryAll => "try_all",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct_socket" => Ok(TransportMode::DirectSocket),
            "stream_socket" => Ok(TransportMode::StreamSocket),
            "shell_redirect" => Ok(TransportMode::ShellRedirect),
            "try_all" => Ok(TransportMode::TryAll),
            _ => Err(ProbeError::UnknownMethod(s.to_string())),
        }
    }
}

/// Final, user-facing result of a probe run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UserOutcome {
    Success { method: String, detail: String },
    Failure { method: String, reason: String },
}

impl UserOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UserOutcome::Success { .. })
    }

    pub fn method(&self) -> &str {
        match self {
            UserOutcome::Success { method, .. } | UserOutcome::Failure { method, .. } => method,
        }
    }
}

impl fmt::Display for UserOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserOutcome::Success { method, detail } => {
                write!(f, "Connection Successful! Method: {} ({})", method, detail)
            }
            UserOutcome::Failure { method, reason } => {
                write!(f, "Connection Failed! Method: {} ({})", method, reason)
            }
        }
    }
}

/// Form submission for `POST /run`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub method: String,
}

impl RunRequest {
    pub fn is_complete(&self) -> bool {
        !self.host.trim().is_empty() && !self.port.trim().is_empty() && !self.method.trim().is_empty()
    }
}

/// Error body returned by admin endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
