//! Capability traits for command execution and shell discovery.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::probe::error::ProbeError;

/// Runs a command text and returns its combined output.
///
/// Implementations must be `Send + Sync` so one executor can serve the relay
/// session wherever it runs.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute `command`.
    ///
    /// # Errors
    ///
    /// * [`ProbeError::PolicyDenied`] when a policy gate refuses the command
    /// * [`ProbeError::CapabilityUnavailable`] when no execution facility exists
    /// * [`ProbeError::ExecutionFailed`] for any other failure
    async fn execute(&self, command: &str) -> Result<Vec<u8>, ProbeError>;

    /// Name of the executor for logging.
    fn name(&self) -> &'static str;
}

/// Finds a shell executable on this host.
pub trait ShellLocator: Send + Sync {
    fn locate(&self) -> Option<PathBuf>;
}
