//! Binary codec for the control protocol.
//!
//! Frame formats, all little-endian:
//! ```text
//! request:  [op:2][out_capacity:4][payload_len:4][payload:N]
//! response: [status:2][payload_len:4][payload:N]
//! ```
//! `out_capacity` is the caller's output buffer bound, reported by the
//! transport so the dispatcher can honor the truncation contract of the
//! snapshot operations.
//!
//! Payload formats:
//! ```text
//! SetFilter/GetFilter:  [mode:2][flag_or_count:2][FilterRule:4 × n]
//! SetModify/GetModify:  [count:2][ModifyRule:6 × n]
//! GetDevices reply:     [active_id:2][count:2]
//! SetActiveDevice /
//! DetectDeviceId reply: [device_id:2]
//! InsertPackets:        raw packet records, count inferred from length
//! GetAttributes reply:  attribute blob, verbatim
//! ```
//! The second SetFilter header field is mode-dependent: a flag mask in
//! `Flags` mode, a rule count in `FlagAndScanCode` mode. `None` and `All`
//! may be sent as the bare two-byte mode.

use thiserror::Error;
use tracing::trace;

use crate::packet::InputPacket;
use crate::protocol::ops::{ControlOp, DeviceQuery};
use crate::rules::{FilterConfig, FilterMode, FilterRule, ModifyRule};

/// Size of the request frame header in bytes.
pub const REQUEST_HEADER_SIZE: usize = 10;

/// Size of the response frame header in bytes.
pub const RESPONSE_HEADER_SIZE: usize = 6;

/// Size of one encoded [`FilterRule`] in bytes.
pub const FILTER_RULE_SIZE: usize = 4;

/// Size of one encoded [`ModifyRule`] in bytes.
pub const MODIFY_RULE_SIZE: usize = 6;

/// Errors raised while encoding or decoding control frames and payloads.
///
/// These are transport-shape failures; they are rejected before a request
/// reaches the operation taxonomy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The operation code is not a recognized value.
    #[error("unknown operation code: 0x{0:04X}")]
    UnknownOperation(u16),

    /// A declared count requires more bytes than the payload provides.
    #[error("declared count needs {needed} payload bytes, got {available}")]
    CountMismatch { needed: usize, available: usize },

    /// A field value is out of range or the payload shape is wrong.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

// ── Read helpers ──────────────────────────────────────────────────────────────

fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, ProtocolError> {
    if bytes.len() < offset + 2 {
        return Err(ProtocolError::InsufficientData {
            needed: offset + 2,
            available: bytes.len(),
        });
    }
    Ok(u16::from_le_bytes([bytes[offset], bytes[offset + 1]]))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, ProtocolError> {
    if bytes.len() < offset + 4 {
        return Err(ProtocolError::InsufficientData {
            needed: offset + 4,
            available: bytes.len(),
        });
    }
    Ok(u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ]))
}

// ── Frame codec ───────────────────────────────────────────────────────────────

/// Encodes a request frame: header plus payload.
pub fn encode_request(op: ControlOp, out_capacity: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(REQUEST_HEADER_SIZE + payload.len());
    buf.extend_from_slice(&(op as u16).to_le_bytes());
    buf.extend_from_slice(&out_capacity.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Decodes one request frame from the beginning of `bytes`.
///
/// Returns the operation, the caller's output capacity, the payload slice,
/// and the total bytes consumed so a streaming reader can advance.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the header is incomplete, the operation
/// code is unknown, or the declared payload has not fully arrived.
pub fn decode_request(bytes: &[u8]) -> Result<(ControlOp, u32, &[u8], usize), ProtocolError> {
    let op_raw = read_u16(bytes, 0)?;
    let out_capacity = read_u32(bytes, 2)?;
    let payload_len = read_u32(bytes, 6)? as usize;

    let op = ControlOp::try_from(op_raw).map_err(|_| ProtocolError::UnknownOperation(op_raw))?;

    let total = REQUEST_HEADER_SIZE + payload_len;
    if bytes.len() < total {
        return Err(ProtocolError::InsufficientData {
            needed: total,
            available: bytes.len(),
        });
    }
    Ok((
        op,
        out_capacity,
        &bytes[REQUEST_HEADER_SIZE..total],
        total,
    ))
}

/// Encodes a response frame: status plus payload.
pub fn encode_response(status: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(RESPONSE_HEADER_SIZE + payload.len());
    buf.extend_from_slice(&status.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Decodes one response frame from the beginning of `bytes`.
///
/// Returns the status, the payload slice, and the total bytes consumed.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] until the whole frame has
/// arrived.
pub fn decode_response(bytes: &[u8]) -> Result<(u16, &[u8], usize), ProtocolError> {
    let status = read_u16(bytes, 0)?;
    let payload_len = read_u32(bytes, 2)? as usize;

    let total = RESPONSE_HEADER_SIZE + payload_len;
    if bytes.len() < total {
        return Err(ProtocolError::InsufficientData {
            needed: total,
            available: bytes.len(),
        });
    }
    Ok((status, &bytes[RESPONSE_HEADER_SIZE..total], total))
}

// ── Filter payloads ───────────────────────────────────────────────────────────

fn write_filter_rule(buf: &mut Vec<u8>, rule: &FilterRule) {
    buf.extend_from_slice(&rule.flag_predicates.to_le_bytes());
    buf.extend_from_slice(&rule.scan_code.to_le_bytes());
}

fn read_filter_rule(bytes: &[u8], offset: usize) -> Result<FilterRule, ProtocolError> {
    Ok(FilterRule {
        flag_predicates: read_u16(bytes, offset)?,
        scan_code: read_u16(bytes, offset + 2)?,
    })
}

fn write_modify_rule(buf: &mut Vec<u8>, rule: &ModifyRule) {
    buf.extend_from_slice(&rule.flag_predicates.to_le_bytes());
    buf.extend_from_slice(&rule.from_code.to_le_bytes());
    buf.extend_from_slice(&rule.to_code.to_le_bytes());
}

fn read_modify_rule(bytes: &[u8], offset: usize) -> Result<ModifyRule, ProtocolError> {
    Ok(ModifyRule {
        flag_predicates: read_u16(bytes, offset)?,
        from_code: read_u16(bytes, offset + 2)?,
        to_code: read_u16(bytes, offset + 4)?,
    })
}

/// Encodes a SetFilter request payload.
///
/// `None` and `All` are sent as the bare mode word, mirroring what the
/// original administrative library put on the wire.
pub fn encode_filter_request(config: &FilterConfig) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(config.mode() as u16).to_le_bytes());
    match config {
        FilterConfig::None | FilterConfig::All => {}
        FilterConfig::Flags(mask) => buf.extend_from_slice(&mask.to_le_bytes()),
        FilterConfig::Rules(rules) => {
            buf.extend_from_slice(&(rules.len() as u16).to_le_bytes());
            for rule in rules {
                write_filter_rule(&mut buf, rule);
            }
        }
    }
    buf
}

/// Decodes a SetFilter request payload into a [`FilterConfig`].
///
/// # Errors
///
/// Returns [`ProtocolError::CountMismatch`] when the declared rule count
/// needs more bytes than the payload carries, and
/// [`ProtocolError::MalformedPayload`] for an unknown mode word.
pub fn decode_filter_request(bytes: &[u8]) -> Result<FilterConfig, ProtocolError> {
    let mode_raw = read_u16(bytes, 0)?;
    let mode = FilterMode::try_from(mode_raw)
        .map_err(|_| ProtocolError::MalformedPayload(format!("unknown filter mode 0x{mode_raw:04X}")))?;

    match mode {
        FilterMode::None => Ok(FilterConfig::None),
        FilterMode::All => Ok(FilterConfig::All),
        FilterMode::Flags => Ok(FilterConfig::Flags(read_u16(bytes, 2)?)),
        FilterMode::FlagAndScanCode => {
            let count = read_u16(bytes, 2)? as usize;
            let needed = 4 + count * FILTER_RULE_SIZE;
            if bytes.len() < needed {
                return Err(ProtocolError::CountMismatch {
                    needed: needed - 4,
                    available: bytes.len() - 4,
                });
            }
            let mut rules = Vec::with_capacity(count);
            for i in 0..count {
                rules.push(read_filter_rule(bytes, 4 + i * FILTER_RULE_SIZE)?);
            }
            Ok(FilterConfig::Rules(rules))
        }
    }
}

/// Encodes a GetFilter reply.
///
/// `flag_or_count` carries the *true* rule count (or the flag mask in
/// `Flags` mode) even when `rules` is a truncated prefix.
pub fn encode_filter_snapshot(mode: FilterMode, flag_or_count: u16, rules: &[FilterRule]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + rules.len() * FILTER_RULE_SIZE);
    buf.extend_from_slice(&(mode as u16).to_le_bytes());
    buf.extend_from_slice(&flag_or_count.to_le_bytes());
    for rule in rules {
        write_filter_rule(&mut buf, rule);
    }
    buf
}

/// Decodes a GetFilter reply into `(mode, flag_or_count, rules)`.
///
/// The rule list is read from whatever whole records follow the header, so a
/// truncated reply still parses; `flag_or_count` reports the true count.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the header is incomplete or the mode word
/// is unknown.
pub fn decode_filter_snapshot(
    bytes: &[u8],
) -> Result<(FilterMode, u16, Vec<FilterRule>), ProtocolError> {
    let mode_raw = read_u16(bytes, 0)?;
    let mode = FilterMode::try_from(mode_raw)
        .map_err(|_| ProtocolError::MalformedPayload(format!("unknown filter mode 0x{mode_raw:04X}")))?;
    let flag_or_count = read_u16(bytes, 2)?;

    let record_count = (bytes.len() - 4) / FILTER_RULE_SIZE;
    let mut rules = Vec::with_capacity(record_count);
    for i in 0..record_count {
        rules.push(read_filter_rule(bytes, 4 + i * FILTER_RULE_SIZE)?);
    }
    if mode == FilterMode::FlagAndScanCode && record_count < flag_or_count as usize {
        trace!(
            true_count = flag_or_count,
            returned = record_count,
            "filter snapshot truncated by caller capacity"
        );
    }
    Ok((mode, flag_or_count, rules))
}

// ── Modify payloads ───────────────────────────────────────────────────────────

/// Encodes a SetModify request payload: count-prefixed rule records.
pub fn encode_modify_request(rules: &[ModifyRule]) -> Vec<u8> {
    encode_modify_snapshot(rules.len() as u16, rules)
}

/// Decodes a SetModify request payload.
///
/// # Errors
///
/// Returns [`ProtocolError::CountMismatch`] when the declared count needs
/// more bytes than the payload carries.
pub fn decode_modify_request(bytes: &[u8]) -> Result<Vec<ModifyRule>, ProtocolError> {
    let count = read_u16(bytes, 0)? as usize;
    let needed = 2 + count * MODIFY_RULE_SIZE;
    if bytes.len() < needed {
        return Err(ProtocolError::CountMismatch {
            needed: needed - 2,
            available: bytes.len() - 2,
        });
    }
    let mut rules = Vec::with_capacity(count);
    for i in 0..count {
        rules.push(read_modify_rule(bytes, 2 + i * MODIFY_RULE_SIZE)?);
    }
    Ok(rules)
}

/// Encodes a GetModify reply; `true_count` may exceed `rules.len()` when the
/// caller's capacity truncated the list.
pub fn encode_modify_snapshot(true_count: u16, rules: &[ModifyRule]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + rules.len() * MODIFY_RULE_SIZE);
    buf.extend_from_slice(&true_count.to_le_bytes());
    for rule in rules {
        write_modify_rule(&mut buf, rule);
    }
    buf
}

/// Decodes a GetModify reply into `(true_count, rules)`; the list holds
/// whatever whole records follow the count.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] when even the count is
/// missing.
pub fn decode_modify_snapshot(bytes: &[u8]) -> Result<(u16, Vec<ModifyRule>), ProtocolError> {
    let true_count = read_u16(bytes, 0)?;
    let record_count = (bytes.len() - 2) / MODIFY_RULE_SIZE;
    let mut rules = Vec::with_capacity(record_count);
    for i in 0..record_count {
        rules.push(read_modify_rule(bytes, 2 + i * MODIFY_RULE_SIZE)?);
    }
    Ok((true_count, rules))
}

// ── Packet payloads ───────────────────────────────────────────────────────────

/// Encodes a packet batch as raw fixed-size records, no count prefix.
pub fn encode_packets<P: InputPacket>(packets: &[P]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(packets.len() * P::RECORD_SIZE);
    for packet in packets {
        packet.encode(&mut buf);
    }
    buf
}

/// Decodes a packet batch; the count is inferred from the payload length.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedPayload`] when the length is not a
/// multiple of the record size (a torn record), and
/// [`ProtocolError::InsufficientData`] for an empty payload.
pub fn decode_packets<P: InputPacket>(bytes: &[u8]) -> Result<Vec<P>, ProtocolError> {
    if bytes.is_empty() {
        return Err(ProtocolError::InsufficientData {
            needed: P::RECORD_SIZE,
            available: 0,
        });
    }
    if bytes.len() % P::RECORD_SIZE != 0 {
        return Err(ProtocolError::MalformedPayload(format!(
            "packet payload of {} bytes is not a multiple of the {}-byte record",
            bytes.len(),
            P::RECORD_SIZE
        )));
    }
    Ok(bytes.chunks_exact(P::RECORD_SIZE).map(P::decode).collect())
}

// ── Small fixed payloads ──────────────────────────────────────────────────────

/// Encodes a GetDevices reply.
pub fn encode_device_query(query: &DeviceQuery) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4);
    buf.extend_from_slice(&query.active_id.to_le_bytes());
    buf.extend_from_slice(&query.count.to_le_bytes());
    buf
}

/// Decodes a GetDevices reply.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] for fewer than four bytes.
pub fn decode_device_query(bytes: &[u8]) -> Result<DeviceQuery, ProtocolError> {
    Ok(DeviceQuery {
        active_id: read_u16(bytes, 0)?,
        count: read_u16(bytes, 2)?,
    })
}

/// Encodes a bare device id (SetActiveDevice request, DetectDeviceId reply).
pub fn encode_device_id(id: u16) -> Vec<u8> {
    id.to_le_bytes().to_vec()
}

/// Decodes a bare device id.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] for fewer than two bytes.
pub fn decode_device_id(bytes: &[u8]) -> Result<u16, ProtocolError> {
    read_u16(bytes, 0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
