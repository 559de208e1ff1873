//! The administrative control surface: one dispatch entry point per
//! transport request.
//!
//! Externally every operation is a synchronous request/response pair: bytes
//! in, bytes out, plus the caller's output-buffer capacity as reported by
//! the transport. Undersized *input* payloads and over-declared rule counts
//! fail `BufferTooSmall` with no mutation; undersized *output* capacity
//! fails `BufferTooSmall` for fixed-size replies and truncates (with the
//! true count preserved) for rule snapshots.
//!
//! DetectDeviceId is the one operation that does not complete inline — the
//! future returned by [`dispatch`] stays pending until some device observes
//! input.

use hidgate_core::error::ControlError;
use hidgate_core::packet::InputPacket;
use hidgate_core::protocol::codec::{
    self, FILTER_RULE_SIZE, MODIFY_RULE_SIZE,
};
use hidgate_core::protocol::ops::ControlOp;
use hidgate_core::ProtocolError;
use tracing::debug;

use crate::application::session::FilterSession;

/// Maps payload-shape failures onto the operation taxonomy: a payload that
/// is merely too short for what it declares is the caller's buffer problem,
/// anything else is a malformed parameter.
fn map_decode_error(err: ProtocolError) -> ControlError {
    match err {
        ProtocolError::InsufficientData { .. } | ProtocolError::CountMismatch { .. } => {
            ControlError::BufferTooSmall
        }
        _ => ControlError::InvalidParameter,
    }
}

/// Executes one administrative operation against `session`.
///
/// Returns the response payload on success.
///
/// # Errors
///
/// Returns the [`ControlError`] the operation resolved to; the transport
/// carries it back as the response status.
pub async fn dispatch<P: InputPacket>(
    session: &FilterSession<P>,
    op: ControlOp,
    payload: &[u8],
    out_capacity: usize,
) -> Result<Vec<u8>, ControlError> {
    debug!(?op, payload_len = payload.len(), out_capacity, "control request");

    match op {
        ControlOp::GetDevices => {
            if out_capacity < 4 {
                return Err(ControlError::BufferTooSmall);
            }
            Ok(codec::encode_device_query(&session.registry().query()))
        }

        ControlOp::SetActiveDevice => {
            let id = codec::decode_device_id(payload).map_err(map_decode_error)?;
            session.registry().set_active_id(id)?;
            Ok(Vec::new())
        }

        ControlOp::DetectDeviceId => {
            if out_capacity < 2 {
                return Err(ControlError::BufferTooSmall);
            }
            let id = session.detect_device_id().await?;
            Ok(codec::encode_device_id(id))
        }

        ControlOp::SetFilter => {
            let config = codec::decode_filter_request(payload).map_err(map_decode_error)?;
            let device = session.active_device()?;
            device.with_rules(|store| store.set_filter(config));
            Ok(Vec::new())
        }

        ControlOp::GetFilter => {
            if out_capacity < 2 {
                return Err(ControlError::BufferTooSmall);
            }
            let device = session.active_device()?;
            if out_capacity < 4 {
                // Room for the mode word alone.
                let mode = device.with_rules(|store| store.filter_snapshot(0).mode);
                return Ok((mode as u16).to_le_bytes().to_vec());
            }
            let max_rules = (out_capacity - 4) / FILTER_RULE_SIZE;
            let snapshot = device.with_rules(|store| store.filter_snapshot(max_rules));
            Ok(codec::encode_filter_snapshot(
                snapshot.mode,
                snapshot.flag_or_count,
                &snapshot.rules,
            ))
        }

        ControlOp::SetModify => {
            let rules = codec::decode_modify_request(payload).map_err(map_decode_error)?;
            let device = session.active_device()?;
            device.with_rules(|store| store.set_modify(rules));
            Ok(Vec::new())
        }

        ControlOp::GetModify => {
            if out_capacity < 2 {
                return Err(ControlError::BufferTooSmall);
            }
            let device = session.active_device()?;
            let max_rules = (out_capacity - 2) / MODIFY_RULE_SIZE;
            let snapshot = device.with_rules(|store| store.modify_snapshot(max_rules));
            Ok(codec::encode_modify_snapshot(
                snapshot.true_count,
                &snapshot.rules,
            ))
        }

        ControlOp::InsertPackets => {
            let batch: Vec<P> = codec::decode_packets(payload).map_err(map_decode_error)?;
            session.insert_packets(&batch)?;
            Ok(Vec::new())
        }

        ControlOp::GetAttributes => {
            let device = session.active_device()?;
            let blob = device.attributes();
            if out_capacity < blob.len() {
                return Err(ControlError::BufferTooSmall);
            }
            Ok(blob.to_vec())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
