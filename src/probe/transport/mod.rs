//! Transport strategies.
//!
//! | Mode | Strategy | Yields |
//! |------|----------|--------|
//! | `direct_socket` | [`DirectSocket`] | stream for the relay |
//! | `stream_socket` | [`StreamSocket`] | stream for the relay (`TCP_NODELAY`) |
//! | `shell_redirect` | `ShellRedirect` | detached process, no relay |
//!
//! Failures are logged inside each strategy and returned as [`ProbeError`]
//! values so the resolver can fall back to the next one.

mod direct;
#[cfg(feature = "shell_redirect")]
mod redirect;
mod stream;
mod traits;

pub use direct::DirectSocket;
#[cfg(feature = "shell_redirect")]
pub use redirect::ShellRedirect;
pub use stream::StreamSocket;
pub use traits::{AttemptContext, ConnectionHandle, Established, RelayStream, TransportStrategy};

use crate::probe::error::ProbeError;
use crate::probe::journal::LogSink;

/// Log a connect failure with its classification and hand the error back.
pub(crate) fn log_connect_failure(
    sink: &LogSink,
    label: &str,
    method: &str,
    err: ProbeError,
) -> ProbeError {
    match err.connect_kind() {
        Some(kind) => sink.error(format!("{}: {} failed ({}) - {}", label, method, kind, err)),
        None => sink.error(format!("{}: {} failed - {}", label, method, err)),
    }
    err
}
