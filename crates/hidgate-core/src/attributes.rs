//! Static device attribute records.
//!
//! Attributes are queried from the underlying device exactly once, when it
//! attaches, and cached as an opaque blob in the device context. The
//! GetAttributes control operation hands the blob back verbatim; the typed
//! structs here exist so the administrative side can build and read those
//! blobs.

use serde::{Deserialize, Serialize};

use crate::protocol::codec::ProtocolError;

// ── Keyboard ──────────────────────────────────────────────────────────────────

/// Keyboard type/subtype pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyboardId {
    pub id_type: u8,
    pub subtype: u8,
}

/// Typematic (auto-repeat) rate and delay limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypematicParameters {
    pub unit_id: u16,
    /// Repeats per second.
    pub rate: u16,
    /// Delay before repeat starts, in milliseconds.
    pub delay: u16,
}

/// Static keyboard attributes: 26 bytes encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyboardAttributes {
    pub keyboard_id: KeyboardId,
    /// Scan code mode.
    pub keyboard_mode: u16,
    pub number_of_function_keys: u16,
    pub number_of_indicators: u16,
    pub number_of_keys_total: u16,
    /// Length of the type-ahead buffer, in bytes.
    pub input_data_queue_length: u32,
    pub key_repeat_minimum: TypematicParameters,
    pub key_repeat_maximum: TypematicParameters,
}

impl KeyboardAttributes {
    /// Encoded size in bytes.
    pub const ENCODED_SIZE: usize = 26;

    /// Encodes the record into its fixed-size little-endian form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::ENCODED_SIZE);
        buf.push(self.keyboard_id.id_type);
        buf.push(self.keyboard_id.subtype);
        buf.extend_from_slice(&self.keyboard_mode.to_le_bytes());
        buf.extend_from_slice(&self.number_of_function_keys.to_le_bytes());
        buf.extend_from_slice(&self.number_of_indicators.to_le_bytes());
        buf.extend_from_slice(&self.number_of_keys_total.to_le_bytes());
        buf.extend_from_slice(&self.input_data_queue_length.to_le_bytes());
        for p in [&self.key_repeat_minimum, &self.key_repeat_maximum] {
            buf.extend_from_slice(&p.unit_id.to_le_bytes());
            buf.extend_from_slice(&p.rate.to_le_bytes());
            buf.extend_from_slice(&p.delay.to_le_bytes());
        }
        buf
    }

    /// Decodes a record previously produced by [`KeyboardAttributes::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InsufficientData`] when the slice is shorter
    /// than [`Self::ENCODED_SIZE`].
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < Self::ENCODED_SIZE {
            return Err(ProtocolError::InsufficientData {
                needed: Self::ENCODED_SIZE,
                available: bytes.len(),
            });
        }
        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        Ok(Self {
            keyboard_id: KeyboardId {
                id_type: bytes[0],
                subtype: bytes[1],
            },
            keyboard_mode: u16_at(2),
            number_of_function_keys: u16_at(4),
            number_of_indicators: u16_at(6),
            number_of_keys_total: u16_at(8),
            input_data_queue_length: u32::from_le_bytes([
                bytes[10], bytes[11], bytes[12], bytes[13],
            ]),
            key_repeat_minimum: TypematicParameters {
                unit_id: u16_at(14),
                rate: u16_at(16),
                delay: u16_at(18),
            },
            key_repeat_maximum: TypematicParameters {
                unit_id: u16_at(20),
                rate: u16_at(22),
                delay: u16_at(24),
            },
        })
    }

    /// A plausible PC/AT enhanced keyboard, used by the daemon's simulated
    /// devices.
    pub fn enhanced_101_key() -> Self {
        Self {
            keyboard_id: KeyboardId {
                id_type: 4,
                subtype: 0,
            },
            keyboard_mode: 1,
            number_of_function_keys: 12,
            number_of_indicators: 3,
            number_of_keys_total: 101,
            input_data_queue_length: 100,
            key_repeat_minimum: TypematicParameters {
                unit_id: 0,
                rate: 2,
                delay: 250,
            },
            key_repeat_maximum: TypematicParameters {
                unit_id: 0,
                rate: 30,
                delay: 1000,
            },
        }
    }
}

// ── Mouse ─────────────────────────────────────────────────────────────────────

/// Static mouse attributes: 10 bytes encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MouseAttributes {
    pub mouse_identifier: u16,
    pub number_of_buttons: u16,
    /// Report rate in Hz.
    pub sample_rate: u16,
    pub input_data_queue_length: u32,
}

impl MouseAttributes {
    /// Encoded size in bytes.
    pub const ENCODED_SIZE: usize = 10;

    /// Encodes the record into its fixed-size little-endian form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::ENCODED_SIZE);
        buf.extend_from_slice(&self.mouse_identifier.to_le_bytes());
        buf.extend_from_slice(&self.number_of_buttons.to_le_bytes());
        buf.extend_from_slice(&self.sample_rate.to_le_bytes());
        buf.extend_from_slice(&self.input_data_queue_length.to_le_bytes());
        buf
    }

    /// Decodes a record previously produced by [`MouseAttributes::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InsufficientData`] when the slice is shorter
    /// than [`Self::ENCODED_SIZE`].
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < Self::ENCODED_SIZE {
            return Err(ProtocolError::InsufficientData {
                needed: Self::ENCODED_SIZE,
                available: bytes.len(),
            });
        }
        Ok(Self {
            mouse_identifier: u16::from_le_bytes([bytes[0], bytes[1]]),
            number_of_buttons: u16::from_le_bytes([bytes[2], bytes[3]]),
            sample_rate: u16::from_le_bytes([bytes[4], bytes[5]]),
            input_data_queue_length: u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
