//! Command execution capability.
//!
//! - `traits`: [`CommandExecutor`] and [`ShellLocator`] capability seams
//! - `policy`: default-deny [`ExecPolicy`] and the [`PolicyGate`] wrapper
//! - `shell`: [`ShellExecutor`] (`sh -c`) and [`PathShellLocator`]

mod policy;
mod shell;
mod traits;

pub use policy::{ExecPolicy, PolicyGate, PolicyMode};
pub use shell::{DEFAULT_SHELL, PathShellLocator, ShellExecutor};
pub use traits::{CommandExecutor, ShellLocator};
