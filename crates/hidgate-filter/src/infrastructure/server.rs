//! Unix-socket control transport.
//!
//! This is the dev-harness stand-in for the host transport: each connection
//! carries a stream of request frames and gets one response frame back per
//! request, in order. Frame layout lives in
//! [`hidgate_core::protocol::codec`]; this module only moves bytes.
//!
//! A socket read may return a partial frame or several frames at once, so
//! bytes accumulate in a receive buffer and complete frames are peeled off
//! one at a time, exactly like any length-prefixed stream protocol.

use std::sync::Arc;

use anyhow::Context;
use hidgate_core::error::STATUS_SUCCESS;
use hidgate_core::packet::InputPacket;
use hidgate_core::protocol::codec::{decode_request, encode_response};
use hidgate_core::ProtocolError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, warn};

use crate::application::session::FilterSession;
use crate::infrastructure::control;

/// Accepts control connections on `listener` until the task is aborted.
pub async fn serve<P: InputPacket>(
    session: Arc<FilterSession<P>>,
    listener: UnixListener,
) -> anyhow::Result<()> {
    loop {
        let (stream, _addr) = listener
            .accept()
            .await
            .context("failed to accept control connection")?;
        let session = session.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(session, stream).await {
                error!("control connection error: {e:#}");
            }
        });
    }
}

/// Serves one control connection: request frame in, response frame out.
async fn handle_connection<P: InputPacket>(
    session: Arc<FilterSession<P>>,
    mut stream: UnixStream,
) -> anyhow::Result<()> {
    let mut recv_buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream
            .read(&mut chunk)
            .await
            .context("control socket read failed")?;
        if n == 0 {
            debug!("control connection closed");
            return Ok(());
        }
        recv_buf.extend_from_slice(&chunk[..n]);

        // Peel off every complete frame currently in the buffer.
        loop {
            let (op, out_capacity, payload, consumed) = match decode_request(&recv_buf) {
                Ok(parts) => parts,
                Err(ProtocolError::InsufficientData { .. }) => break, // need more bytes
                Err(e) => {
                    // Malformed traffic is rejected at the transport, before
                    // any operation sees it.
                    warn!("rejecting malformed control frame: {e}");
                    return Ok(());
                }
            };
            let payload = payload.to_vec();
            recv_buf.drain(..consumed);

            let response =
                match control::dispatch(&session, op, &payload, out_capacity as usize).await {
                    Ok(reply) => encode_response(STATUS_SUCCESS, &reply),
                    Err(err) => encode_response(err.status_code(), &[]),
                };
            stream
                .write_all(&response)
                .await
                .context("control socket write failed")?;
        }
    }
}
