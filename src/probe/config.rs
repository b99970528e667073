//! Configuration resolution for the reachability probe.
//!
//! Every value is resolved with a three-tier priority system:
//!
//! 1. **Parameter** - Explicitly provided function parameter (highest priority)
//! 2. **Environment Variable** - Value from environment variable
//! 3. **Default** - Built-in default value (lowest priority)
//!
//! Unparseable environment values fall through to the default.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PROBE_CONNECT_TIMEOUT` | 10s | Connect timeout per strategy in seconds |
//! | `PROBE_READ_TIMEOUT` | 5s | Relay read timeout in seconds |
//! | `PROBE_SESSION_MAX_SECS` | 300s | Relay session duration cap in seconds |
//! | `PROBE_MAX_COMMANDS` | 1000 | Relay command cap |
//! | `PROBE_EXEC_POLICY` | `deny` | `deny`, `allow-list` or `allow-all` |
//! | `PROBE_EXEC_ALLOW` | (empty) | Comma-separated allow-list regexes |
//! | `PROBE_ADMIN_PORT` | 8000 | Admin HTTP port (bound to 127.0.0.1) |
//! | `PROBE_SETTINGS_PATH` | (unset) | JSON file backing the settings store |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use super::exec::{ExecPolicy, PolicyMode};
use super::relay::{DEFAULT_READ_BUFFER, SessionLimits};

/// Default connect timeout in seconds
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default relay read timeout in seconds
pub(crate) const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;

/// Default relay session cap in seconds
pub(crate) const DEFAULT_SESSION_MAX_SECS: u64 = 300;

/// Default relay command cap
pub(crate) const DEFAULT_MAX_COMMANDS: u32 = 1000;

/// Default admin HTTP port
pub(crate) const DEFAULT_ADMIN_PORT: u16 = 8000;

pub(crate) const CONNECT_TIMEOUT_ENV_VAR: &str = "PROBE_CONNECT_TIMEOUT";
pub(crate) const READ_TIMEOUT_ENV_VAR: &str = "PROBE_READ_TIMEOUT";
pub(crate) const SESSION_MAX_SECS_ENV_VAR: &str = "PROBE_SESSION_MAX_SECS";
pub(crate) const MAX_COMMANDS_ENV_VAR: &str = "PROBE_MAX_COMMANDS";
pub(crate) const EXEC_POLICY_ENV_VAR: &str = "PROBE_EXEC_POLICY";
pub(crate) const EXEC_ALLOW_ENV_VAR: &str = "PROBE_EXEC_ALLOW";
pub(crate) const ADMIN_PORT_ENV_VAR: &str = "PROBE_ADMIN_PORT";
pub(crate) const SETTINGS_PATH_ENV_VAR: &str = "PROBE_SETTINGS_PATH";

/// parameter -> parsed env var -> default
fn resolve_parsed<T: FromStr>(param: Option<T>, env_var: &str, default: T) -> T {
    if let Some(value) = param {
        return value;
    }

    if let Ok(raw) = env::var(env_var)
        && let Ok(value) = raw.trim().parse::<T>()
    {
        return value;
    }

    default
}

/// Resolve the connect timeout with priority: parameter -> env var -> default
pub(crate) fn resolve_connect_timeout(timeout_param: Option<u64>) -> u64 {
    resolve_parsed(timeout_param, CONNECT_TIMEOUT_ENV_VAR, DEFAULT_CONNECT_TIMEOUT_SECS)
}

/// Resolve the read timeout with priority: parameter -> env var -> default
pub(crate) fn resolve_read_timeout(timeout_param: Option<u64>) -> u64 {
    resolve_parsed(timeout_param, READ_TIMEOUT_ENV_VAR, DEFAULT_READ_TIMEOUT_SECS)
}

/// Resolve the session cap with priority: parameter -> env var -> default
pub(crate) fn resolve_session_max_secs(max_param: Option<u64>) -> u64 {
    resolve_parsed(max_param, SESSION_MAX_SECS_ENV_VAR, DEFAULT_SESSION_MAX_SECS)
}

/// Resolve the command cap with priority: parameter -> env var -> default
pub(crate) fn resolve_max_commands(max_param: Option<u32>) -> u32 {
    resolve_parsed(max_param, MAX_COMMANDS_ENV_VAR, DEFAULT_MAX_COMMANDS)
}

/// Resolve the admin port with priority: parameter -> env var -> default
pub(crate) fn resolve_admin_port(port_param: Option<u16>) -> u16 {
    resolve_parsed(port_param, ADMIN_PORT_ENV_VAR, DEFAULT_ADMIN_PORT)
}

/// Resolve the execution policy mode.
///
/// An unrecognized env value is logged and falls back to `deny`.
pub(crate) fn resolve_exec_policy_mode(mode_param: Option<PolicyMode>) -> PolicyMode {
    if let Some(mode) = mode_param {
        return mode;
    }

    match env::var(EXEC_POLICY_ENV_VAR) {
        Ok(raw) => raw.parse::<PolicyMode>().unwrap_or_else(|e| {
            warn!("{}; falling back to deny", e);
            PolicyMode::Deny
        }),
        Err(_) => PolicyMode::default(),
    }
}

/// Resolve the allow-list patterns. Empty entries are dropped.
pub(crate) fn resolve_exec_allow(patterns_param: Option<Vec<String>>) -> Vec<String> {
    if let Some(patterns) = patterns_param {
        return patterns;
    }

    env::var(EXEC_ALLOW_ENV_VAR)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Resolve the settings file path; `None` keeps settings in memory only.
pub(crate) fn resolve_settings_path(path_param: Option<PathBuf>) -> Option<PathBuf> {
    path_param.or_else(|| {
        env::var(SETTINGS_PATH_ENV_VAR)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    })
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub connect_timeout: Duration,
    pub limits: SessionLimits,
    pub policy: ExecPolicy,
    pub admin_port: u16,
    pub settings_path: Option<PathBuf>,
}

impl ProbeConfig {
    /// Resolve every value from the environment and defaults.
    pub fn from_env() -> Self {
        let mode = resolve_exec_policy_mode(None);
        let patterns = resolve_exec_allow(None);

        Self {
            connect_timeout: Duration::from_secs(resolve_connect_timeout(None)),
            limits: SessionLimits {
                max_commands: resolve_max_commands(None),
                max_duration: Duration::from_secs(resolve_session_max_secs(None)),
                read_timeout: Duration::from_secs(resolve_read_timeout(None)),
                read_buffer: DEFAULT_READ_BUFFER,
            },
            policy: ExecPolicy::from_config(mode, &patterns),
            admin_port: resolve_admin_port(None),
            settings_path: resolve_settings_path(None),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            limits: SessionLimits::default(),
            policy: ExecPolicy::default(),
            admin_port: DEFAULT_ADMIN_PORT,
            settings_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    // Use a mutex to serialize env var tests to avoid race conditions
    static ENV_TEST_MUTEX: once_cell::sync::Lazy<StdMutex<()>> =
        once_cell::sync::Lazy::new(|| StdMutex::new(()));

    /// SAFETY: Must be called while holding ENV_TEST_MUTEX to prevent data races.
    unsafe fn set_env(key: &str, value: &str) {
        // SAFETY: Caller ensures ENV_TEST_MUTEX is held
        unsafe { env::set_var(key, value) };
    }

    /// SAFETY: Must be called while holding ENV_TEST_MUTEX to prevent data races.
    unsafe fn remove_env(key: &str) {
        // SAFETY: Caller ensures ENV_TEST_MUTEX is held
        unsafe { env::remove_var(key) };
    }

    mod config_resolution {
        use super::*;

        mod connect_timeout {
            use super::*;

            #[test]
            fn test_uses_param_when_provided() {
                assert_eq!(resolve_connect_timeout(Some(3)), 3);
            }

            #[test]
            fn test_param_takes_priority_over_env() {
                let _guard = ENV_TEST_MUTEX.lock().unwrap();
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    set_env(CONNECT_TIMEOUT_ENV_VAR, "120");
                }
                let result = resolve_connect_timeout(Some(45));
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    remove_env(CONNECT_TIMEOUT_ENV_VAR);
                }
                assert_eq!(result, 45);
            }

            #[test]
            fn test_uses_env_var_when_no_param() {
                let _guard = ENV_TEST_MUTEX.lock().unwrap();
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    set_env(CONNECT_TIMEOUT_ENV_VAR, "25");
                }
                let result = resolve_connect_timeout(None);
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    remove_env(CONNECT_TIMEOUT_ENV_VAR);
                }
                assert_eq!(result, 25);
            }

            #[test]
            fn test_uses_default_when_no_param_or_env() {
                let _guard = ENV_TEST_MUTEX.lock().unwrap();
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    remove_env(CONNECT_TIMEOUT_ENV_VAR);
                }
                assert_eq!(resolve_connect_timeout(None), DEFAULT_CONNECT_TIMEOUT_SECS);
            }

            #[test]
            fn test_ignores_invalid_env_var() {
                let _guard = ENV_TEST_MUTEX.lock().unwrap();
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    set_env(CONNECT_TIMEOUT_ENV_VAR, "-10");
                }
                let result = resolve_connect_timeout(None);
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    remove_env(CONNECT_TIMEOUT_ENV_VAR);
                }
                assert_eq!(result, DEFAULT_CONNECT_TIMEOUT_SECS);
            }
        }

        mod session_limits {
            use super::*;

            #[test]
            fn test_max_commands_from_env() {
                let _guard = ENV_TEST_MUTEX.lock().unwrap();
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    set_env(MAX_COMMANDS_ENV_VAR, " 50 ");
                }
                let result = resolve_max_commands(None);
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    remove_env(MAX_COMMANDS_ENV_VAR);
                }
                assert_eq!(result, 50);
            }

            #[test]
            fn test_defaults() {
                let _guard = ENV_TEST_MUTEX.lock().unwrap();
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    remove_env(READ_TIMEOUT_ENV_VAR);
                    remove_env(SESSION_MAX_SECS_ENV_VAR);
                    remove_env(MAX_COMMANDS_ENV_VAR);
                }
                assert_eq!(resolve_read_timeout(None), 5);
                assert_eq!(resolve_session_max_secs(None), 300);
                assert_eq!(resolve_max_commands(None), 1000);
            }
        }

        mod exec_policy {
            use super::*;

            #[test]
            fn test_defaults_to_deny() {
                let _guard = ENV_TEST_MUTEX.lock().unwrap();
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    remove_env(EXEC_POLICY_ENV_VAR);
                }
                assert_eq!(resolve_exec_policy_mode(None), PolicyMode::Deny);
            }

            #[test]
            fn test_unknown_env_value_falls_back_to_deny() {
                let _guard = ENV_TEST_MUTEX.lock().unwrap();
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    set_env(EXEC_POLICY_ENV_VAR, "yolo");
                }
                let result = resolve_exec_policy_mode(None);
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    remove_env(EXEC_POLICY_ENV_VAR);
                }
                assert_eq!(result, PolicyMode::Deny);
            }

            #[test]
            fn test_allow_list_from_env() {
                let _guard = ENV_TEST_MUTEX.lock().unwrap();
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    set_env(EXEC_POLICY_ENV_VAR, "allow-list");
                    set_env(EXEC_ALLOW_ENV_VAR, "^uptime$, ^df -h$ ,,");
                }
                let mode = resolve_exec_policy_mode(None);
                let patterns = resolve_exec_allow(None);
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    remove_env(EXEC_POLICY_ENV_VAR);
                    remove_env(EXEC_ALLOW_ENV_VAR);
                }
                assert_eq!(mode, PolicyMode::AllowList);
                assert_eq!(patterns, vec!["^uptime$".to_string(), "^df -h$".to_string()]);

                let policy = ExecPolicy::from_config(mode, &patterns);
                assert!(policy.check("uptime").is_ok());
                assert!(policy.check("reboot").is_err());
            }
        }

        mod probe_config {
            use super::*;

            #[test]
            fn test_from_env_without_overrides_matches_default() {
                let _guard = ENV_TEST_MUTEX.lock().unwrap();
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    for var in [
                        CONNECT_TIMEOUT_ENV_VAR,
                        READ_TIMEOUT_ENV_VAR,
                        SESSION_MAX_SECS_ENV_VAR,
                        MAX_COMMANDS_ENV_VAR,
                        EXEC_POLICY_ENV_VAR,
                        EXEC_ALLOW_ENV_VAR,
                        ADMIN_PORT_ENV_VAR,
                        SETTINGS_PATH_ENV_VAR,
                    ] {
                        remove_env(var);
                    }
                }

                let config = ProbeConfig::from_env();
                let default = ProbeConfig::default();
                assert_eq!(config.connect_timeout, default.connect_timeout);
                assert_eq!(config.limits, default.limits);
                assert_eq!(config.policy.mode(), PolicyMode::Deny);
                assert_eq!(config.admin_port, 8000);
                assert_eq!(config.settings_path, None);
            }

            #[test]
            fn test_settings_path_from_env() {
                let _guard = ENV_TEST_MUTEX.lock().unwrap();
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    set_env(SETTINGS_PATH_ENV_VAR, "/tmp/probe-settings.json");
                }
                let result = resolve_settings_path(None);
                // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
                unsafe {
                    remove_env(SETTINGS_PATH_ENV_VAR);
                }
                assert_eq!(result, Some(PathBuf::from("/tmp/probe-settings.json")));
            }
        }
    }
}
