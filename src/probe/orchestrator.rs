//! Single entry point for a diagnostic run.
//!
//! Validates the raw inputs, frames the run with banner entries in the
//! journal, resolves the requested mode and folds everything into a
//! [`UserOutcome`]. Errors never escape; they become `Failure` outcomes.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use super::error::ProbeError;
use super::journal::LogSink;
use super::resolver::StrategyResolver;
use super::target::{ValidatedTarget, validate};
use super::types::{TransportMode, UserOutcome};

pub struct Orchestrator {
    resolver: StrategyResolver,
    sink: Arc<LogSink>,
    run_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(resolver: StrategyResolver, sink: Arc<LogSink>) -> Self {
        Self {
            resolver,
            sink,
            run_lock: Mutex::new(()),
        }
    }

    pub fn sink(&self) -> &Arc<LogSink> {
        &self.sink
    }

    /// Run one diagnostic. Concurrent callers queue behind the run lock.
    pub async fn run(&self, host: &str, port: &str, method: &str) -> UserOutcome {
        let _guard = self.run_lock.lock().await;

        let (target, mode) = match parse_inputs(host, port, method) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.sink.error(e.to_string());
                return UserOutcome::Failure {
                    method: method.trim().to_string(),
                    reason: e.to_string(),
                };
            }
        };

        info!("Probe run requested: {} via {}", target, mode);
        self.sink
            .info(format!("=== STARTING CONNECTION TEST: {} ===", mode));
        self.sink.info(format!("Target: {}", target));

        let outcome = match self.resolver.resolve(mode, &target).await {
            Ok(resolution) => {
                let used = resolution.mode();
                self.sink.success(format!(
                    "Connection test completed successfully using: {}",
                    used
                ));
                UserOutcome::Success {
                    method: used.to_string(),
                    detail: resolution.detail(),
                }
            }
            Err(e) => {
                self.sink
                    .error(format!("Connection test failed for method: {}", mode));
                UserOutcome::Failure {
                    method: mode.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        self.sink.info("=== CONNECTION TEST COMPLETE ===");
        outcome
    }
}

/// Host first, then port, then method.
fn parse_inputs(
    host: &str,
    port: &str,
    method: &str,
) -> Result<(ValidatedTarget, TransportMode), ProbeError> {
    let target = validate(host, port)?;
    let mode = method.parse::<TransportMode>()?;
    Ok((target, mode))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use tokio::net::TcpListener;

    use super::*;
    use crate::probe::journal::LogLevel;
    use crate::probe::resolver::StrategySet;
    use crate::probe::resolver::tests::{Behaviour, MockStrategy, resolver};
    use crate::probe::transport::{DirectSocket, StreamSocket};

    fn mock_set() -> (StrategySet, Arc<MockStrategy>) {
        let direct = MockStrategy::new(TransportMode::DirectSocket, Behaviour::Refuse);
        let set = StrategySet {
            direct: direct.clone(),
            stream: MockStrategy::new(TransportMode::StreamSocket, Behaviour::Refuse),
            redirect: None,
        };
        (set, direct)
    }

    fn orchestrator(set: StrategySet) -> (Orchestrator, Arc<LogSink>) {
        let sink = Arc::new(LogSink::in_memory());
        (Orchestrator::new(resolver(set, sink.clone()), sink.clone()), sink)
    }

    mod validation {
        use super::*;

        #[tokio::test]
        async fn test_invalid_host_logs_single_error() {
            let (set, direct) = mock_set();
            let (orchestrator, sink) = orchestrator(set);

            let outcome = orchestrator.run("256.1.1.1", "80", "direct_socket").await;

            assert_eq!(
                outcome,
                UserOutcome::Failure {
                    method: "direct_socket".to_string(),
                    reason: "Invalid host format: 256.1.1.1".to_string(),
                }
            );
            let entries = sink.entries();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].level, LogLevel::Error);
            assert_eq!(direct.attempts.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn test_host_checked_before_port() {
            let (set, _) = mock_set();
            let (orchestrator, sink) = orchestrator(set);

            let outcome = orchestrator.run("bad host", "0", "nope").await;
            assert!(!outcome.is_success());
            assert!(sink.entries()[0].message.starts_with("Invalid host format"));
        }

        #[tokio::test]
        async fn test_invalid_port() {
            let (set, _) = mock_set();
            let (orchestrator, sink) = orchestrator(set);

            orchestrator.run("example.com", "65536", "direct_socket").await;
            assert_eq!(sink.len(), 1);
            assert!(sink.entries()[0].message.starts_with("Invalid port number"));
        }

        #[tokio::test]
        async fn test_unknown_method() {
            let (set, direct) = mock_set();
            let (orchestrator, sink) = orchestrator(set);

            let outcome = orchestrator.run("example.com", "443", "carrier_pigeon").await;
            match outcome {
                UserOutcome::Failure { method, reason } => {
                    assert_eq!(method, "carrier_pigeon");
                    assert_eq!(reason, "Unknown method: carrier_pigeon");
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
            assert_eq!(sink.len(), 1);
            assert_eq!(direct.attempts.load(Ordering::SeqCst), 0);
        }
    }

    mod runs {
        use super::*;

        #[tokio::test]
        async fn test_success_is_framed_by_banners() {
            let set = StrategySet {
                direct: MockStrategy::new(TransportMode::DirectSocket, Behaviour::Connect),
                stream: MockStrategy::new(TransportMode::StreamSocket, Behaviour::Refuse),
                redirect: None,
            };
            let (orchestrator, sink) = orchestrator(set);

            let outcome = orchestrator.run("10.0.0.5", "4444", "try_all").await;

            assert!(outcome.is_success());
            assert_eq!(outcome.method(), "direct_socket");
            let entries = sink.entries();
            assert_eq!(entries[0].message, "=== STARTING CONNECTION TEST: try_all ===");
            assert_eq!(entries[1].message, "Target: 10.0.0.5:4444");
            let last = entries.last().unwrap();
            assert_eq!(last.message, "=== CONNECTION TEST COMPLETE ===");
            assert!(entries.iter().any(|e| e.level == LogLevel::Success
                && e.message == "Connection test completed successfully using: direct_socket"));
        }

        #[tokio::test]
        async fn test_failure_reports_requested_method() {
            let (set, _) = mock_set();
            let (orchestrator, sink) = orchestrator(set);

            let outcome = orchestrator.run("10.0.0.5", "4444", "try_all").await;

            assert_eq!(outcome.method(), "try_all");
            assert!(sink.entries().iter().any(|e| e.level == LogLevel::Error
                && e.message == "Connection test failed for method: try_all"));
        }

        #[tokio::test]
        async fn test_direct_refused_against_real_socket() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();
            drop(listener);

            let set = StrategySet {
                direct: Arc::new(DirectSocket),
                stream: Arc::new(StreamSocket),
                redirect: None,
            };
            let (orchestrator, sink) = orchestrator(set);

            let outcome = orchestrator
                .run("127.0.0.1", &port.to_string(), "direct_socket")
                .await;

            match &outcome {
                UserOutcome::Failure { reason, .. } => assert!(reason.contains("(Code: ")),
                other => panic!("unexpected outcome: {other:?}"),
            }
            let entries = sink.entries();
            let attempts = entries
                .iter()
                .filter(|e| e.message.contains("Attempting"))
                .count();
            let connect_failures = entries
                .iter()
                .filter(|e| e.level == LogLevel::Error && e.message.contains("(Code: "))
                .count();
            assert_eq!(attempts, 1);
            assert_eq!(connect_failures, 1);
            assert!(!entries.iter().any(|e| e.message.contains("Session ended")));
        }
    }
}
