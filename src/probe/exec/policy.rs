//! Default-deny execution policy.
//!
//! Payloads relayed from the remote peer are untrusted. Nothing runs unless the
//! deployment opts in:
//!
//! | Mode | Behaviour |
//! |------|-----------|
//! | `deny` (default) | Every command is refused. |
//! | `allow-list` | Command must match one of the configured regex patterns and contain no shell metacharacters. |
//! | `allow-all` | Everything runs. Also required by the shell redirect transport. |
//!
//! [`PolicyGate`] applies a policy in front of any [`CommandExecutor`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tracing::error;

use super::traits::CommandExecutor;
use crate::probe::error::ProbeError;

/// Characters that would let an allow-listed command chain or redirect into
/// something else once handed to `sh -c`.
const SHELL_METACHARACTERS: &[char] = &[';', '|', '&', '`', '$', '>', '<', '(', ')', '\n', '\r'];

/// Configured policy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyMode {
    #[default]
    Deny,
    AllowList,
    AllowAll,
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyMode::Deny => write!(f, "deny"),
            PolicyMode::AllowList => write!(f, "allow-list"),
            PolicyMode::AllowAll => write!(f, "allow-all"),
        }
    }
}

impl FromStr for PolicyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deny" | "deny-all" => Ok(PolicyMode::Deny),
            "allow-list" | "allowlist" => Ok(PolicyMode::AllowList),
            "allow-all" => Ok(PolicyMode::AllowAll),
            other => Err(format!("unknown execution policy: {}", other)),
        }
    }
}

/// Compiled execution policy.
#[derive(Debug, Clone, Default)]
pub enum ExecPolicy {
    #[default]
    DenyAll,
    AllowList(Vec<Regex>),
    AllowAll,
}

impl ExecPolicy {
    /// Build a policy from its mode and raw allow-list patterns.
    ///
    /// Each pattern is anchored so it must match the entire command. Patterns
    /// that fail to compile are logged and skipped; an allow list with no
    /// usable pattern refuses everything.
    pub fn from_config(mode: PolicyMode, patterns: &[String]) -> Self {
        match mode {
            PolicyMode::Deny => ExecPolicy::DenyAll,
            PolicyMode::AllowAll => ExecPolicy::AllowAll,
            PolicyMode::AllowList => {
                let mut compiled = Vec::with_capacity(patterns.len());
                for pattern in patterns {
                    // Patterns must cover the whole command, not a substring of it.
                    match Regex::new(&format!("^(?:{})$", pattern)) {
                        Ok(regex) => compiled.push(regex),
                        Err(e) => {
                            error!(pattern = %pattern, error = %e, "Invalid allow-list pattern")
                        }
                    }
                }
                ExecPolicy::AllowList(compiled)
            }
        }
    }

    pub fn mode(&self) -> PolicyMode {
        match self {
            ExecPolicy::DenyAll => PolicyMode::Deny,
            ExecPolicy::AllowList(_) => PolicyMode::AllowList,
            ExecPolicy::AllowAll => PolicyMode::AllowAll,
        }
    }

    /// Whether unrestricted shell access is permitted.
    pub fn allows_unrestricted(&self) -> bool {
        matches!(self, ExecPolicy::AllowAll)
    }

    /// Check a command against the policy.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::PolicyDenied`] with the reason when refused.
    pub fn check(&self, command: &str) -> Result<(), ProbeError> {
        let normalized = command.trim();

        match self {
            ExecPolicy::DenyAll => Err(ProbeError::PolicyDenied(
                "command execution is disabled (policy: deny)".to_string(),
            )),
            ExecPolicy::AllowAll => Ok(()),
            ExecPolicy::AllowList(patterns) => {
                if normalized.contains(SHELL_METACHARACTERS) {
                    return Err(ProbeError::PolicyDenied(
                        "shell metacharacters are not permitted".to_string(),
                    ));
                }
                if patterns.iter().any(|p| p.is_match(normalized)) {
                    Ok(())
                } else {
                    Err(ProbeError::PolicyDenied(
                        "command not in allow list".to_string(),
                    ))
                }
            }
        }
    }
}

/// Executor wrapper that enforces an [`ExecPolicy`] before delegating.
pub struct PolicyGate {
    policy: Arc<ExecPolicy>,
    inner: Arc<dyn CommandExecutor>,
}

impl PolicyGate {
    pub fn new(policy: Arc<ExecPolicy>, inner: Arc<dyn CommandExecutor>) -> Self {
        Self { policy, inner }
    }
}

#[async_trait]
impl CommandExecutor for PolicyGate {
    async fn execute(&self, command: &str) -> Result<Vec<u8>, ProbeError> {
        self.policy.check(command)?;
        self.inner.execute(command).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingExecutor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CommandExecutor for CountingExecutor {
        async fn execute(&self, command: &str) -> Result<Vec<u8>, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(command.as_bytes().to_vec())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn allow_list(patterns: &[&str]) -> ExecPolicy {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        ExecPolicy::from_config(PolicyMode::AllowList, &patterns)
    }

    mod policy_mode {
        use super::*;

        #[test]
        fn test_parse() {
            assert_eq!("deny".parse::<PolicyMode>(), Ok(PolicyMode::Deny));
            assert_eq!("Allow-List".parse::<PolicyMode>(), Ok(PolicyMode::AllowList));
            assert_eq!("allow-all".parse::<PolicyMode>(), Ok(PolicyMode::AllowAll));
            assert!("yolo".parse::<PolicyMode>().is_err());
        }

        #[test]
        fn test_default_is_deny() {
            assert_eq!(PolicyMode::default(), PolicyMode::Deny);
            assert_eq!(ExecPolicy::default().mode(), PolicyMode::Deny);
        }
    }

    mod checks {
        use super::*;

        #[test]
        fn test_deny_all_refuses_everything() {
            let policy = ExecPolicy::DenyAll;
            assert!(matches!(policy.check("id"), Err(ProbeError::PolicyDenied(_))));
            assert!(matches!(policy.check("true"), Err(ProbeError::PolicyDenied(_))));
            assert!(!policy.allows_unrestricted());
        }

        #[test]
        fn test_allow_all() {
            let policy = ExecPolicy::AllowAll;
            assert!(policy.check("uname -a; id").is_ok());
            assert!(policy.allows_unrestricted());
        }

        #[test]
        fn test_allow_list_matches_patterns() {
            let policy = allow_list(&[r"^uptime$", r"^df -h( /\w*)?$"]);
            assert!(policy.check("uptime").is_ok());
            assert!(policy.check("  df -h /var ").is_ok());
            assert!(policy.check("whoami").is_err());
            assert!(!policy.allows_unrestricted());
        }

        #[test]
        fn test_allow_list_rejects_metacharacters() {
            let policy = allow_list(&[r"^uptime"]);
            for command in ["uptime; id", "uptime | nc x 1", "uptime && id", "uptime $(id)", "uptime > /tmp/x"] {
                assert_eq!(
                    policy.check(command),
                    Err(ProbeError::PolicyDenied(
                        "shell metacharacters are not permitted".to_string()
                    )),
                    "{command}"
                );
            }
        }

        #[test]
        fn test_allow_list_requires_whole_command_match() {
            let policy = allow_list(&["uptime", "df -h|free"]);
            assert!(policy.check("uptime").is_ok());
            assert!(policy.check("free").is_ok());
            assert!(policy.check("rm -rf /home uptime").is_err());
            assert!(policy.check("uptime --since").is_err());
            assert!(policy.check("df -h /").is_err());
            assert!(policy.check("freeze").is_err());
        }

        #[test]
        fn test_invalid_patterns_skipped() {
            let policy = allow_list(&["(unclosed", r"^uptime$"]);
            match &policy {
                ExecPolicy::AllowList(patterns) => assert_eq!(patterns.len(), 1),
                other => panic!("unexpected policy: {other:?}"),
            }
            assert!(policy.check("uptime").is_ok());
        }

        #[test]
        fn test_empty_allow_list_refuses() {
            let policy = allow_list(&[]);
            assert!(policy.check("uptime").is_err());
        }
    }

    mod gate {
        use super::*;

        #[tokio::test]
        async fn test_default_policy_never_reaches_executor() {
            let inner = Arc::new(CountingExecutor {
                calls: AtomicUsize::new(0),
            });
            let gate = PolicyGate::new(Arc::new(ExecPolicy::default()), inner.clone());

            let result = gate.execute("cat /etc/passwd").await;
            assert!(matches!(result, Err(ProbeError::PolicyDenied(_))));
            assert_eq!(inner.calls.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn test_permitted_command_delegates() {
            let inner = Arc::new(CountingExecutor {
                calls: AtomicUsize::new(0),
            });
            let gate = PolicyGate::new(Arc::new(allow_list(&[r"^uptime$"])), inner.clone());

            assert_eq!(gate.execute("uptime").await.unwrap(), b"uptime");
            assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
            assert_eq!(gate.name(), "counting");
        }
    }
}
