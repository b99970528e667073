//! Local shell execution and shell discovery.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::traits::{CommandExecutor, ShellLocator};
use crate::probe::error::ProbeError;

/// Default shell used to interpret relayed commands.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Runs commands through `<shell> -c`, merging stdout and stderr.
///
/// The script starts with `exec 2>&1`, so both streams share one pipe and
/// keep the order they were written in.
///
/// The child is killed if the execution future is dropped, which happens when
/// the session deadline cuts a command short.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: PathBuf,
}

impl ShellExecutor {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, command: &str) -> Result<Vec<u8>, ProbeError> {
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(format!("exec 2>&1\n{}", command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => ProbeError::CapabilityUnavailable(format!(
                    "shell {} not found",
                    self.shell.display()
                )),
                _ => ProbeError::ExecutionFailed(format!("{}: {}", self.shell.display(), e)),
            })?;

        debug!(
            "Command exited with {:?} ({} stdout bytes, {} stderr bytes)",
            output.status.code(),
            output.stdout.len(),
            output.stderr.len()
        );

        // Only the shell's own diagnostics can still land on stderr.
        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);
        Ok(combined)
    }

    fn name(&self) -> &'static str {
        "shell"
    }
}

/// Searches `PATH` for a named shell program.
#[derive(Debug, Clone)]
pub struct PathShellLocator {
    program: String,
    search_path: Option<OsString>,
}

impl PathShellLocator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            search_path: None,
        }
    }

    /// Search this path list instead of the process `PATH`.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }
}

impl Default for PathShellLocator {
    fn default() -> Self {
        Self::new("bash")
    }
}

impl ShellLocator for PathShellLocator {
    fn locate(&self) -> Option<PathBuf> {
        let search_path = self.search_path.clone().or_else(|| env::var_os("PATH"))?;

        env::split_paths(&search_path)
            .map(|dir| dir.join(&self.program))
            .find(|candidate| is_executable(candidate))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
