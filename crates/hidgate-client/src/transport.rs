//! Transport seam between the typed client and the filter's control surface.
//!
//! The filter treats its transport as "bytes in / bytes out"; this trait is
//! the client-side mirror of that. Production code uses [`UnixTransport`];
//! tests substitute a scripted implementation.

use async_trait::async_trait;
use hidgate_core::protocol::ops::ControlOp;

use crate::client::ClientError;

/// Issues one control request and returns the raw `(status, payload)` pair.
#[async_trait]
pub trait ControlTransport: Send {
    async fn call(
        &mut self,
        op: ControlOp,
        out_capacity: u32,
        payload: &[u8],
    ) -> Result<(u16, Vec<u8>), ClientError>;
}

// ── Unix socket transport ─────────────────────────────────────────────────────

#[cfg(unix)]
mod unix {
    use super::*;
    use hidgate_core::protocol::codec::{decode_response, encode_request};
    use hidgate_core::ProtocolError;
    use std::path::Path;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixStream;
    use tracing::debug;

    /// Control connection to a running filter daemon.
    pub struct UnixTransport {
        stream: UnixStream,
        recv_buf: Vec<u8>,
    }

    impl UnixTransport {
        /// Connects to the daemon's control socket.
        ///
        /// # Errors
        ///
        /// Returns [`ClientError::Io`] if the socket cannot be reached.
        pub async fn connect(path: impl AsRef<Path>) -> Result<Self, ClientError> {
            let stream = UnixStream::connect(path.as_ref()).await?;
            debug!(path = %path.as_ref().display(), "control socket connected");
            Ok(Self {
                stream,
                recv_buf: Vec::new(),
            })
        }
    }

    #[async_trait]
    impl ControlTransport for UnixTransport {
        async fn call(
            &mut self,
            op: ControlOp,
            out_capacity: u32,
            payload: &[u8],
        ) -> Result<(u16, Vec<u8>), ClientError> {
            self.stream
                .write_all(&encode_request(op, out_capacity, payload))
                .await?;

            // One response per request; accumulate until it decodes whole.
            let mut chunk = [0u8; 4096];
            loop {
                match decode_response(&self.recv_buf) {
                    Ok((status, body, consumed)) => {
                        let body = body.to_vec();
                        self.recv_buf.drain(..consumed);
                        return Ok((status, body));
                    }
                    Err(ProtocolError::InsufficientData { .. }) => {}
                    Err(e) => return Err(ClientError::Protocol(e)),
                }
                let n = self.stream.read(&mut chunk).await?;
                if n == 0 {
                    return Err(ClientError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "control connection closed mid-response",
                    )));
                }
                self.recv_buf.extend_from_slice(&chunk[..n]);
            }
        }
    }
}

#[cfg(unix)]
pub use unix::UnixTransport;
