//! Transport strategy trait and the connection handle it yields.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::probe::error::ProbeError;
use crate::probe::journal::LogSink;
use crate::probe::target::ValidatedTarget;
use crate::probe::types::TransportMode;

/// Byte stream a relay session can drive.
pub trait RelayStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> RelayStream for T {}

/// An established byte-stream endpoint.
///
/// Owned by the strategy that created it until handed to the relay, which
/// consumes it and closes the stream when the session ends.
pub struct ConnectionHandle {
    stream: Box<dyn RelayStream>,
    local_addr: String,
    remote_addr: String,
}

impl ConnectionHandle {
    pub fn new(
        stream: impl RelayStream + 'static,
        local_addr: impl Into<String>,
        remote_addr: impl Into<String>,
    ) -> Self {
        Self {
            stream: Box::new(stream),
            local_addr: local_addr.into(),
            remote_addr: remote_addr.into(),
        }
    }

    /// Wrap a connected TCP stream, recording its socket names.
    pub fn from_tcp(stream: TcpStream) -> Self {
        let local = stream
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let remote = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self::new(stream, local, remote)
    }

    pub fn local_addr(&self) -> &str {
        &self.local_addr
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub(crate) fn into_stream(self) -> Box<dyn RelayStream> {
        self.stream
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("local_addr", &self.local_addr)
            .field("remote_addr", &self.remote_addr)
            .finish_non_exhaustive()
    }
}

/// What a successful attempt produced.
#[derive(Debug)]
pub enum Established {
    /// A stream the relay session can drive.
    Stream(ConnectionHandle),
    /// A detached process was launched; nothing to relay.
    Detached { pid: Option<u32> },
}

/// Per-attempt settings shared by all strategies.
#[derive(Clone)]
pub struct AttemptContext {
    pub connect_timeout: Duration,
    pub sink: Arc<LogSink>,
}

/// One method of reaching the target.
///
/// Every attempt logs an "attempting" entry first and exactly one outcome
/// entry (SUCCESS or ERROR) before returning.
#[async_trait]
pub trait TransportStrategy: Send + Sync {
    /// Mode this strategy implements.
    fn mode(&self) -> TransportMode;

    /// Prefix used in journal lines, e.g. `Method 1`.
    fn label(&self) -> &'static str;

    async fn attempt(
        &self,
        target: &ValidatedTarget,
        ctx: &AttemptContext,
    ) -> Result<Established, ProbeError>;
}
