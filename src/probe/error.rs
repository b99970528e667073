//! Error taxonomy for the probe and classification of connect failures.
//!
//! Every failure in the probe converges to a [`ProbeError`] value. Transport
//! strategies return them as signals rather than aborting, which is what lets
//! the `try_all` mode fall through to the next strategy.
//!
//! # Connect Error Classification
//!
//! Socket errors are reduced to a `(code, message)` pair for the audit log and
//! additionally classified into a [`ConnectErrorKind`] so the log line says
//! *why* the target was unreachable:
//!
//! 1. **Refused**: the host answered but nothing listens on the port.
//! 2. **TimedOut**: no answer within the connect timeout.
//! 3. **Unreachable**: routing failure (network or host unreachable).
//! 4. **Resolution**: the hostname could not be resolved.
//! 5. **Other**: anything that matches none of the above.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errno reported for connect attempts that exceed the connect timeout.
pub const ETIMEDOUT: i32 = 110;

/// Every failure the probe can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("Invalid host format: {0}")]
    InvalidHost(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// A required system facility (executor, shell, socket support) is absent.
    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("{message} (Code: {code})")]
    ConnectFailed { code: i32, message: String },

    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Command denied by execution policy: {0}")]
    PolicyDenied(String),

    /// Normal session termination cause, recorded for observability.
    #[error("Session timeout reached")]
    SessionTimeout,
}

impl ProbeError {
    /// Build a `ConnectFailed` from an I/O error, keeping the OS errno.
    pub fn connect_failed(err: &io::Error) -> Self {
        let text = err.to_string();
        // io::Error appends " (os error N)"; the code is reported separately.
        let message = text
            .split(" (os error")
            .next()
            .unwrap_or(text.as_str())
            .to_string();

        ProbeError::ConnectFailed {
            code: err.raw_os_error().unwrap_or(0),
            message,
        }
    }

    /// Build a `ConnectFailed` for an attempt that hit the connect timeout.
    pub fn connect_timeout(timeout: Duration) -> Self {
        ProbeError::ConnectFailed {
            code: ETIMEDOUT,
            message: format!("Connection timed out after {:?}", timeout),
        }
    }

    /// Classify this error if it is a connect failure.
    pub fn connect_kind(&self) -> Option<ConnectErrorKind> {
        match self {
            ProbeError::ConnectFailed { code, message } => {
                Some(classify_connect_error(*code, message))
            }
            _ => None,
        }
    }
}

/// Coarse reason a connect attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectErrorKind {
    Refused,
    TimedOut,
    Unreachable,
    Resolution,
    Other,
}

impl fmt::Display for ConnectErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectErrorKind::Refused => write!(f, "refused"),
            ConnectErrorKind::TimedOut => write!(f, "timed out"),
            ConnectErrorKind::Unreachable => write!(f, "unreachable"),
            ConnectErrorKind::Resolution => write!(f, "name resolution"),
            ConnectErrorKind::Other => write!(f, "other"),
        }
    }
}

const REFUSED_ERRORS: &[&str] = &["connection refused"];

const TIMEOUT_ERRORS: &[&str] = &["timed out", "timeout"];

const UNREACHABLE_ERRORS: &[&str] = &[
    "network is unreachable",
    "no route to host",
    "host is unreachable",
    "host is down",
];

const RESOLUTION_ERRORS: &[&str] = &[
    "failed to lookup address",
    "name or service not known",
    "temporary failure in name resolution",
    "nodename nor servname",
    "no such host",
    "no addresses resolved",
];

/// Classify a connect failure from its errno and message.
///
/// The errno wins when it is one of the well-known Linux values; otherwise the
/// message is matched case-insensitively against known patterns.
pub fn classify_connect_error(code: i32, message: &str) -> ConnectErrorKind {
    match code {
        111 => return ConnectErrorKind::Refused,
        ETIMEDOUT => return ConnectErrorKind::TimedOut,
        101 | 112 | 113 => return ConnectErrorKind::Unreachable,
        _ => {}
    }

    let message_lower = message.to_lowercase();
    let matches = |patterns: &[&str]| patterns.iter().any(|p| message_lower.contains(p));

    if matches(REFUSED_ERRORS) {
        ConnectErrorKind::Refused
    } else if matches(RESOLUTION_ERRORS) {
        ConnectErrorKind::Resolution
    } else if matches(UNREACHABLE_ERRORS) {
        ConnectErrorKind::Unreachable
    } else if matches(TIMEOUT_ERRORS) {
        ConnectErrorKind::TimedOut
    } else {
        ConnectErrorKind::Other
    }
}
