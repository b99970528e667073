//! Strategy resolution.
//!
//! Maps a [`TransportMode`] to the strategy (or ordered strategies) that serve
//! it, and hands any established stream to the [`SessionRelay`].
//!
//! `try_all` walks [`TransportMode::FALLBACK_ORDER`] and stops at the first
//! strategy that establishes anything; later strategies are never attempted.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::error::ProbeError;
use super::journal::LogSink;
use super::relay::{SessionRelay, SessionStats};
use super::target::ValidatedTarget;
use super::transport::{AttemptContext, DirectSocket, Established, StreamSocket, TransportStrategy};
use super::types::TransportMode;

#[cfg(feature = "shell_redirect")]
use super::exec::{ExecPolicy, ShellLocator};
#[cfg(feature = "shell_redirect")]
use super::transport::ShellRedirect;

/// What a successful resolution produced.
#[derive(Debug)]
pub enum Resolution {
    /// A stream was established and relayed until the session ended.
    Relayed {
        mode: TransportMode,
        stats: SessionStats,
    },
    /// A detached process was launched; there is no relay session.
    Detached { mode: TransportMode, pid: Option<u32> },
}

impl Resolution {
    /// The concrete mode that succeeded (never `TryAll`).
    pub fn mode(&self) -> TransportMode {
        match self {
            Resolution::Relayed { mode, .. } | Resolution::Detached { mode, .. } => *mode,
        }
    }

    /// Short human-readable description for the user outcome.
    pub fn detail(&self) -> String {
        match self {
            Resolution::Relayed { stats, .. } => format!(
                "session ended ({}) after {} command(s) in {:.2}s",
                stats.termination,
                stats.commands_processed,
                stats.duration.as_secs_f64()
            ),
            Resolution::Detached { .. } => "detached launch, no relay session".to_string(),
        }
    }
}

/// The strategies available to the resolver.
///
/// `redirect` is `None` when the `shell_redirect` feature is disabled or the
/// caller chose not to provide it.
#[derive(Clone)]
pub struct StrategySet {
    pub direct: Arc<dyn TransportStrategy>,
    pub stream: Arc<dyn TransportStrategy>,
    pub redirect: Option<Arc<dyn TransportStrategy>>,
}

impl StrategySet {
    /// The built-in strategies.
    #[cfg(feature = "shell_redirect")]
    pub fn standard(policy: Arc<ExecPolicy>, locator: Arc<dyn ShellLocator>) -> Self {
        Self {
            direct: Arc::new(DirectSocket),
            stream: Arc::new(StreamSocket),
            redirect: Some(Arc::new(ShellRedirect::new(locator, policy))),
        }
    }

    /// The built-in strategies.
    #[cfg(not(feature = "shell_redirect"))]
    pub fn standard() -> Self {
        Self {
            direct: Arc::new(DirectSocket),
            stream: Arc::new(StreamSocket),
            redirect: None,
        }
    }

    fn for_mode(&self, mode: TransportMode) -> Result<&Arc<dyn TransportStrategy>, ProbeError> {
        match mode {
            TransportMode::DirectSocket => Ok(&self.direct),
            TransportMode::StreamSocket => Ok(&self.stream),
            TransportMode::ShellRedirect => self.redirect.as_ref().ok_or_else(|| {
                ProbeError::CapabilityUnavailable(
                    "shell redirect support is not compiled in".to_string(),
                )
            }),
            TransportMode::TryAll => Err(ProbeError::UnknownMethod(mode.to_string())),
        }
    }
}

/// Resolves modes to strategies and relays established streams.
pub struct StrategyResolver {
    strategies: StrategySet,
    relay: SessionRelay,
    sink: Arc<LogSink>,
    connect_timeout: Duration,
}

impl StrategyResolver {
    pub fn new(
        strategies: StrategySet,
        relay: SessionRelay,
        sink: Arc<LogSink>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            strategies,
            relay,
            sink,
            connect_timeout,
        }
    }

    /// Run `mode` against `target`.
    ///
    /// For a single mode the strategy's error is returned unchanged. For
    /// `try_all` the last error is returned once every strategy has failed.
    pub async fn resolve(
        &self,
        mode: TransportMode,
        target: &ValidatedTarget,
    ) -> Result<Resolution, ProbeError> {
        let ctx = AttemptContext {
            connect_timeout: self.connect_timeout,
            sink: self.sink.clone(),
        };

        if mode != TransportMode::TryAll {
            let strategy = self.strategies.for_mode(mode)?;
            return self.run_strategy(strategy.as_ref(), target, &ctx).await;
        }

        let mut last_error = None;
        for candidate in TransportMode::FALLBACK_ORDER {
            let strategy = match self.strategies.for_mode(candidate) {
                Ok(strategy) => strategy,
                Err(e) => {
                    debug!("Skipping {} in fallback: {}", candidate, e);
                    last_error = Some(e);
                    continue;
                }
            };
            match self.run_strategy(strategy.as_ref(), target, &ctx).await {
                Ok(resolution) => return Ok(resolution),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProbeError::CapabilityUnavailable("no transport strategies available".to_string())
        }))
    }

    async fn run_strategy(
        &self,
        strategy: &dyn TransportStrategy,
        target: &ValidatedTarget,
        ctx: &AttemptContext,
    ) -> Result<Resolution, ProbeError> {
        let mode = strategy.mode();
        match strategy.attempt(target, ctx).await? {
            Established::Stream(handle) => {
                let stats = self.relay.run(handle, mode.as_str()).await;
                Ok(Resolution::Relayed { mode, stats })
            }
            Established::Detached { pid } => Ok(Resolution::Detached { mode, pid }),
        }
    }
}
