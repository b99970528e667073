//! Bounded relay session over an established connection.
//!
//! The relay reads payloads from the peer, runs them through the injected
//! (policy-gated) command executor and writes the output back.
//!
//! # Loop
//!
//! Each iteration:
//!
//! 1. **Duration check**: if the session has run for `max_duration`, stop.
//!    This check has priority over everything else.
//! 2. **Read** up to `read_buffer` bytes, bounded by `read_timeout` (or the
//!    remaining session time if shorter). A timed-out read just loops again;
//!    a zero-byte read means the peer closed the stream.
//! 3. **Execute** the trimmed, non-empty payload. Execution is bounded by the
//!    remaining session time and abandoned mid-command if it runs out.
//! 4. **Respond** with the output, or a placeholder when execution failed or
//!    produced nothing, and flush. The write is bounded by the remaining
//!    session time as well.
//! 5. **Command cap**: stop once `max_commands` payloads were processed.
//!
//! Execution failures (including policy denials) never end the session.
//!
//! # Resource Release
//!
//! [`SessionRelay::run`] consumes the [`ConnectionHandle`]. The stream is shut
//! down after the loop on every exit path and dropped when `run` returns, so a
//! panic inside the loop still closes the socket during unwinding.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{Instant, timeout};
use tracing::debug;
use uuid::Uuid;

use super::error::ProbeError;
use super::exec::CommandExecutor;
use super::journal::LogSink;
use super::transport::{ConnectionHandle, RelayStream};

/// Default maximum number of commands processed per session.
pub const DEFAULT_MAX_COMMANDS: u32 = 1000;

/// Default wall-clock cap for a session.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(300);

/// Default per-read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Default maximum payload size per read.
pub const DEFAULT_READ_BUFFER: usize = 2048;

/// Number of characters of a command kept in the journal preview.
pub const PREVIEW_CHARS: usize = 100;

/// Sent to the peer when a command could not be executed.
pub const FAILED_PLACEHOLDER: &str = "Command execution failed or returned null\n";

/// Sent to the peer when a command succeeded without output.
pub const EMPTY_PLACEHOLDER: &str = "No output from command.";

/// Hard bounds enforced by every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_commands: u32,
    pub max_duration: Duration,
    pub read_timeout: Duration,
    pub read_buffer: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_commands: DEFAULT_MAX_COMMANDS,
            max_duration: DEFAULT_MAX_DURATION,
            read_timeout: DEFAULT_READ_TIMEOUT,
            read_buffer: DEFAULT_READ_BUFFER,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    PeerClosed,
    CommandLimit,
    SessionTimeout,
    ReadFailed,
    WriteFailed,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::PeerClosed => write!(f, "peer closed"),
            Termination::CommandLimit => write!(f, "command limit reached"),
            Termination::SessionTimeout => write!(f, "session timeout"),
            Termination::ReadFailed => write!(f, "read failed"),
            Termination::WriteFailed => write!(f, "write failed"),
        }
    }
}

/// How a single command ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum CommandOutcome {
    Executed,
    Failed(String),
    Denied(String),
}

/// Audit record for one processed command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRecord {
    pub sequence: u32,
    /// Preview of the command, truncated to [`PREVIEW_CHARS`]
    pub command: String,
    pub execution_time_ms: f64,
    pub output_length_bytes: usize,
    pub outcome: CommandOutcome,
}

/// Summary of a finished session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub session_id: Uuid,
    pub started_at: DateTime<Local>,
    pub duration: Duration,
    pub commands_processed: u32,
    pub termination: Termination,
    pub records: Vec<CommandRecord>,
}

/// Truncate a command for logging, marking the cut with `...`.
pub fn preview(command: &str) -> String {
    let mut chars = command.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Drives read/execute/write sessions.
pub struct SessionRelay {
    sink: Arc<LogSink>,
    executor: Option<Arc<dyn CommandExecutor>>,
    limits: SessionLimits,
}

impl SessionRelay {
    pub fn new(
        sink: Arc<LogSink>,
        executor: Option<Arc<dyn CommandExecutor>>,
        limits: SessionLimits,
    ) -> Self {
        Self {
            sink,
            executor,
            limits,
        }
    }

    /// Run a session over `handle` until EOF, the command cap or the duration cap.
    pub async fn run(&self, handle: ConnectionHandle, label: &str) -> SessionStats {
        let session_id = Uuid::new_v4();
        let executor = self.executor.as_ref().map(|e| e.name()).unwrap_or("none");
        self.sink.info(format!(
            "Initiating relay session {} using {} (executor: {})",
            session_id, label, executor
        ));
        self.sink.info(format!(
            "Local socket: {}, Remote socket: {}",
            handle.local_addr(),
            handle.remote_addr()
        ));

        let started_at = Local::now();
        let start = Instant::now();
        let mut stream = handle.into_stream();
        let mut records = Vec::new();

        let termination = self
            .drive(&mut *stream, label, start, &mut records)
            .await;

        match timeout(self.limits.read_timeout, stream.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Shutdown after session {} failed: {}", session_id, e),
            Err(_) => debug!("Shutdown after session {} timed out", session_id),
        }
        drop(stream);

        let duration = start.elapsed();
        let commands_processed = records.len() as u32;
        self.sink.info(format!(
            "[{}] Session ended ({}). Duration: {:.2}s, Commands processed: {}",
            label,
            termination,
            duration.as_secs_f64(),
            commands_processed
        ));

        SessionStats {
            session_id,
            started_at,
            duration,
            commands_processed,
            termination,
            records,
        }
    }

    /// Time left before the session cap, or `None` once it has been reached.
    fn remaining(&self, start: Instant) -> Option<Duration> {
        self.limits
            .max_duration
            .checked_sub(start.elapsed())
            .filter(|d| !d.is_zero())
    }

    fn log_timeout(&self, label: &str) {
        self.sink.warning(format!(
            "[{}] Session timeout reached ({}s), closing connection",
            label,
            self.limits.max_duration.as_secs()
        ));
    }

    async fn execute(&self, command: &str) -> Result<Vec<u8>, ProbeError> {
        match &self.executor {
            Some(executor) => executor.execute(command).await,
            None => Err(ProbeError::CapabilityUnavailable(
                "no command executor configured".to_string(),
            )),
        }
    }

    async fn drive(
        &self,
        stream: &mut dyn RelayStream,
        label: &str,
        start: Instant,
        records: &mut Vec<CommandRecord>,
    ) -> Termination {
        let mut buf = vec![0u8; self.limits.read_buffer];
        let mut command_count: u32 = 0;

        loop {
            let Some(remaining) = self.remaining(start) else {
                self.log_timeout(label);
                return Termination::SessionTimeout;
            };

            if command_count >= self.limits.max_commands {
                self.sink.warning(format!(
                    "[{}] Command limit reached ({}), closing connection",
                    label, self.limits.max_commands
                ));
                return Termination::CommandLimit;
            }

            let read_limit = remaining.min(self.limits.read_timeout);
            let n = match timeout(read_limit, stream.read(&mut buf)).await {
                Err(_) => continue,
                Ok(Ok(0)) => {
                    self.sink.info(format!("[{}] Peer closed the connection", label));
                    return Termination::PeerClosed;
                }
                Ok(Ok(n)) => n,
                Ok(Err(e)) => {
                    self.sink.error(format!("[{}] Read failed: {}", label, e));
                    return Termination::ReadFailed;
                }
            };

            let payload = String::from_utf8_lossy(&buf[..n]);
            let command = payload.trim();
            if command.is_empty() {
                continue;
            }

            command_count += 1;
            let command_preview = preview(command);
            self.sink.info(format!(
                "[{}] Received command #{}: {}",
                label, command_count, command_preview
            ));

            let Some(remaining) = self.remaining(start) else {
                self.log_timeout(label);
                return Termination::SessionTimeout;
            };

            let exec_start = Instant::now();
            let result = match timeout(remaining, self.execute(command)).await {
                Ok(result) => result,
                Err(_) => {
                    self.log_timeout(label);
                    return Termination::SessionTimeout;
                }
            };
            let execution_time_ms = exec_start.elapsed().as_secs_f64() * 1000.0;

            let (response, output_length_bytes, outcome) = match result {
                Ok(output) => {
                    self.sink.info(format!(
                        "[{}] Command #{} executed successfully in {:.2}ms, output length: {} bytes",
                        label,
                        command_count,
                        execution_time_ms,
                        output.len()
                    ));
                    let len = output.len();
                    let response = if output.is_empty() {
                        EMPTY_PLACEHOLDER.as_bytes().to_vec()
                    } else {
                        output
                    };
                    (response, len, CommandOutcome::Executed)
                }
                Err(ProbeError::PolicyDenied(reason)) => {
                    self.sink.warning(format!(
                        "[{}] Command #{} denied by execution policy: {}",
                        label, command_count, reason
                    ));
                    (
                        FAILED_PLACEHOLDER.as_bytes().to_vec(),
                        0,
                        CommandOutcome::Denied(reason),
                    )
                }
                Err(e) => {
                    self.sink.error(format!(
                        "[{}] Command #{} execution failed: {}",
                        label, command_count, e
                    ));
                    (
                        FAILED_PLACEHOLDER.as_bytes().to_vec(),
                        0,
                        CommandOutcome::Failed(e.to_string()),
                    )
                }
            };

            records.push(CommandRecord {
                sequence: command_count,
                command: command_preview,
                execution_time_ms,
                output_length_bytes,
                outcome,
            });

            let Some(remaining) = self.remaining(start) else {
                self.log_timeout(label);
                return Termination::SessionTimeout;
            };

            // A peer that stops reading stalls the write; the session cap still applies.
            match timeout(remaining, write_response(stream, &response)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.sink.error(format!(
                        "[{}] Failed to send response for command #{}: {}",
                        label, command_count, e
                    ));
                    return Termination::WriteFailed;
                }
                Err(_) => {
                    self.log_timeout(label);
                    return Termination::SessionTimeout;
                }
            }
            self.sink.info(format!(
                "[{}] Sent response for command #{}: {} bytes",
                label,
                command_count,
                response.len()
            ));
        }
    }
}

async fn write_response(stream: &mut dyn RelayStream, response: &[u8]) -> std::io::Result<()> {
    stream.write_all(response).await?;
    stream.flush().await
}
