//! Wiring for a running probe.
//!
//! [`ProbeService`] owns everything a run needs: the settings store, the
//! journal and the orchestrator. Binaries build one at startup and share it
//! through `Arc`.

use std::sync::Arc;

use tracing::info;

use super::config::ProbeConfig;
use super::exec::{CommandExecutor, PolicyGate, ShellExecutor};
#[cfg(feature = "shell_redirect")]
use super::exec::PathShellLocator;
use super::journal::LogSink;
use super::orchestrator::Orchestrator;
use super::relay::SessionRelay;
use super::resolver::{StrategyResolver, StrategySet};
use super::storage::{ProbeSettings, SettingsLogStore, SettingsStore};
use super::types::UserOutcome;

pub struct ProbeService {
    settings: Arc<dyn SettingsStore>,
    sink: Arc<LogSink>,
    orchestrator: Orchestrator,
}

impl ProbeService {
    /// Build the service with the built-in strategies and a policy-gated
    /// `sh -c` executor.
    pub fn new(config: &ProbeConfig, settings: Arc<dyn SettingsStore>) -> Self {
        let policy = Arc::new(config.policy.clone());
        let executor: Arc<dyn CommandExecutor> = Arc::new(PolicyGate::new(
            policy.clone(),
            Arc::new(ShellExecutor::default()),
        ));

        #[cfg(feature = "shell_redirect")]
        let strategies = StrategySet::standard(policy.clone(), Arc::new(PathShellLocator::default()));
        #[cfg(not(feature = "shell_redirect"))]
        let strategies = StrategySet::standard();

        info!(
            "Execution policy: {}, session limits: {} commands / {}s",
            policy.mode(),
            config.limits.max_commands,
            config.limits.max_duration.as_secs()
        );

        Self::with_parts(config, settings, strategies, Some(executor))
    }

    /// Build the service from explicit parts.
    pub fn with_parts(
        config: &ProbeConfig,
        settings: Arc<dyn SettingsStore>,
        strategies: StrategySet,
        executor: Option<Arc<dyn CommandExecutor>>,
    ) -> Self {
        let sink = Arc::new(LogSink::new(Arc::new(SettingsLogStore::new(settings.clone()))));
        let relay = SessionRelay::new(sink.clone(), executor, config.limits);
        let resolver = StrategyResolver::new(strategies, relay, sink.clone(), config.connect_timeout);

        Self {
            settings,
            orchestrator: Orchestrator::new(resolver, sink.clone()),
            sink,
        }
    }

    pub fn sink(&self) -> &Arc<LogSink> {
        &self.sink
    }

    pub fn settings(&self) -> ProbeSettings {
        ProbeSettings::load(self.settings.as_ref())
    }

    /// Persist the submitted form, then run it.
    pub async fn submit(&self, settings: ProbeSettings) -> UserOutcome {
        settings.save(self.settings.as_ref());
        self.orchestrator
            .run(&settings.host, &settings.port, &settings.method)
            .await
    }

    pub fn clear_logs(&self) {
        self.sink.clear();
        self.sink.info("System logs cleared");
    }
}
