//! Method 2: explicitly resolved TCP connect with `TCP_NODELAY`.
//!
//! Resolves the target up front and tries each address in turn. The first
//! connected stream gets Nagle's algorithm disabled so small relay writes are
//! not coalesced.

use std::io;

use async_trait::async_trait;
use tokio::net::{TcpStream, lookup_host};

use super::traits::{AttemptContext, ConnectionHandle, Established, TransportStrategy};
use super::log_connect_failure;
use crate::probe::error::ProbeError;
use crate::probe::target::ValidatedTarget;
use crate::probe::types::TransportMode;

pub struct StreamSocket;

async fn connect_nodelay(target: &ValidatedTarget) -> io::Result<TcpStream> {
    let mut last_error = None;

    for addr in lookup_host((target.host(), target.port())).await? {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error.unwrap_or_else(|| io::Error::other("no addresses resolved")))
}

#[async_trait]
impl TransportStrategy for StreamSocket {
    fn mode(&self) -> TransportMode {
        TransportMode::StreamSocket
    }

    fn label(&self) -> &'static str {
        "Method 2"
    }

    async fn attempt(
        &self,
        target: &ValidatedTarget,
        ctx: &AttemptContext,
    ) -> Result<Established, ProbeError> {
        ctx.sink.info(format!(
            "{}: Attempting stream socket connection to {} (tcp_nodelay)",
            self.label(),
            target
        ));

        match tokio::time::timeout(ctx.connect_timeout, connect_nodelay(target)).await {
            Ok(Ok(stream)) => {
                ctx.sink.success(format!(
                    "{}: stream socket connection successful",
                    self.label()
                ));
                Ok(Established::Stream(ConnectionHandle::from_tcp(stream)))
            }
            Ok(Err(e)) => Err(log_connect_failure(
                &ctx.sink,
                self.label(),
                "stream socket",
                ProbeError::connect_failed(&e),
            )),
            Err(_) => Err(log_connect_failure(
                &ctx.sink,
                self.label(),
                "stream socket",
                ProbeError::connect_timeout(ctx.connect_timeout),
            )),
        }
    }
}
