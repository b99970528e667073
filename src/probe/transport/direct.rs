//! Method 1: plain timed TCP connect.

use async_trait::async_trait;
use tokio::net::TcpStream;

use super::traits::{AttemptContext, ConnectionHandle, Established, TransportStrategy};
use super::log_connect_failure;
use crate::probe::error::ProbeError;
use crate::probe::target::ValidatedTarget;
use crate::probe::types::TransportMode;

pub struct DirectSocket;

#[async_trait]
impl TransportStrategy for DirectSocket {
    fn mode(&self) -> TransportMode {
        TransportMode::DirectSocket
    }

    fn label(&self) -> &'static str {
        "Method 1"
    }

    async fn attempt(
        &self,
        target: &ValidatedTarget,
        ctx: &AttemptContext,
    ) -> Result<Established, ProbeError> {
        ctx.sink.info(format!(
            "{}: Attempting direct socket connection to {}",
            self.label(),
            target
        ));

        let connect = TcpStream::connect((target.host(), target.port()));

        match tokio::time::timeout(ctx.connect_timeout, connect).await {
            Ok(Ok(stream)) => {
                ctx.sink.success(format!(
                    "{}: direct socket connection successful",
                    self.label()
                ));
                Ok(Established::Stream(ConnectionHandle::from_tcp(stream)))
            }
            Ok(Err(e)) => Err(log_connect_failure(
                &ctx.sink,
                self.label(),
                "direct socket",
                ProbeError::connect_failed(&e),
            )),
            Err(_) => Err(log_connect_failure(
                &ctx.sink,
                self.label(),
                "direct socket",
                ProbeError::connect_timeout(ctx.connect_timeout),
            )),
        }
    }
}
