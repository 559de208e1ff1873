//! Fixed-layout input event records and the packet trait the filter engine
//! operates on.
//!
//! Packets travel in *batches*: contiguous ordered runs delivered together in
//! one callback from the device stack. Batch order is preserved end to end
//! except for packets dropped by filtering. In practice keyboard batches are
//! overwhelmingly a single packet.
//!
//! # Flag translation
//!
//! In the raw keyboard record a cleared break bit means *key down*, so a plain
//! key-down arrives with `flags == 0` and a predicate mask could never select
//! it. [`translate_flags`] therefore remaps the raw flags into *predicate
//! space* before any rule is evaluated: bit 0 always means "down", bit 1
//! always means "up", and the extended-scan/terminal-services bits shift up
//! one position. Rule predicates are written against predicate space, never
//! against raw flags.

use serde::{Deserialize, Serialize};

// ── Raw keyboard flag bits ────────────────────────────────────────────────────

/// Raw flag bits as they appear in the keyboard input record.
pub mod key_flags {
    /// Key release. A cleared bit is a key press.
    pub const KEY_BREAK: u16 = 0x0001;
    /// Extended scan code prefix 0xE0.
    pub const KEY_E0: u16 = 0x0002;
    /// Extended scan code prefix 0xE1.
    pub const KEY_E1: u16 = 0x0004;
    pub const KEY_TERMSRV_SET_LED: u16 = 0x0008;
    pub const KEY_TERMSRV_SHADOW: u16 = 0x0010;
    pub const KEY_TERMSRV_VKPACKET: u16 = 0x0020;
}

// ── Predicate-space bits ──────────────────────────────────────────────────────

/// Translated flag bits used by rule predicates (see [`translate_flags`]).
pub mod predicate {
    /// Key press.
    pub const KEY_DOWN: u16 = 0x0001;
    /// Key release.
    pub const KEY_UP: u16 = 0x0002;
    /// Extended scan code prefix 0xE0.
    pub const KEY_E0: u16 = 0x0004;
    /// Extended scan code prefix 0xE1.
    pub const KEY_E1: u16 = 0x0008;
    /// Matches every packet regardless of direction.
    pub const ANY: u16 = 0xFFFF;
}

/// Mouse button-state bits, already one distinct bit per transition.
pub mod mouse_buttons {
    pub const LEFT_BUTTON_DOWN: u16 = 0x0001;
    pub const LEFT_BUTTON_UP: u16 = 0x0002;
    pub const RIGHT_BUTTON_DOWN: u16 = 0x0004;
    pub const RIGHT_BUTTON_UP: u16 = 0x0008;
    pub const MIDDLE_BUTTON_DOWN: u16 = 0x0010;
    pub const MIDDLE_BUTTON_UP: u16 = 0x0020;
    pub const BUTTON_4_DOWN: u16 = 0x0040;
    pub const BUTTON_4_UP: u16 = 0x0080;
    pub const BUTTON_5_DOWN: u16 = 0x0100;
    pub const BUTTON_5_UP: u16 = 0x0200;
    pub const MOUSE_WHEEL: u16 = 0x0400;
    pub const MOUSE_HWHEEL: u16 = 0x0800;
}

/// Maps raw keyboard flags into predicate space.
///
/// `0` (a plain key-down) becomes [`predicate::KEY_DOWN`]; anything else
/// shifts left one bit, which puts the break bit on [`predicate::KEY_UP`] and
/// moves E0/E1 up accordingly.
#[inline]
pub fn translate_flags(raw: u16) -> u16 {
    if raw == 0 {
        1
    } else {
        raw << 1
    }
}

// ── Packet trait ──────────────────────────────────────────────────────────────

/// A fixed-size input event record the filter engine can evaluate rules
/// against.
///
/// `match_flags` yields the predicate-space bits a rule's flag mask is tested
/// against; `code`/`set_code` expose the field filter rules compare and
/// modify rules rewrite.
pub trait InputPacket: Clone + Send + Sync + 'static {
    /// Encoded size of one record on the wire, in bytes.
    const RECORD_SIZE: usize;

    /// Predicate-space flags for rule matching.
    fn match_flags(&self) -> u16;

    /// The field filter rules compare and modify rules rewrite.
    fn code(&self) -> u16;

    /// Rewrites the matchable field (used by modify rules).
    fn set_code(&mut self, code: u16);

    /// Appends exactly [`Self::RECORD_SIZE`] little-endian bytes to `buf`.
    fn encode(&self, buf: &mut Vec<u8>);

    /// Decodes one record from a slice of exactly [`Self::RECORD_SIZE`] bytes.
    ///
    /// Callers (the codec) are responsible for slicing record boundaries.
    fn decode(bytes: &[u8]) -> Self;
}

// ── Keyboard packet ───────────────────────────────────────────────────────────

/// One keyboard input event: 12 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyboardPacket {
    /// Unit number of the originating keyboard port.
    pub unit_id: u16,
    /// The "make" scan code.
    pub code: u16,
    /// Raw flag bits (see [`key_flags`]).
    pub flags: u16,
    pub reserved: u16,
    /// Device-specific extra information, passed through untouched.
    pub extra: u32,
}

impl KeyboardPacket {
    /// A key-press packet for `code`.
    pub fn key_down(unit_id: u16, code: u16) -> Self {
        Self {
            unit_id,
            code,
            flags: 0,
            reserved: 0,
            extra: 0,
        }
    }

    /// A key-release packet for `code`.
    pub fn key_up(unit_id: u16, code: u16) -> Self {
        Self {
            unit_id,
            code,
            flags: key_flags::KEY_BREAK,
            reserved: 0,
            extra: 0,
        }
    }
}

impl InputPacket for KeyboardPacket {
    const RECORD_SIZE: usize = 12;

    fn match_flags(&self) -> u16 {
        translate_flags(self.flags)
    }

    fn code(&self) -> u16 {
        self.code
    }

    fn set_code(&mut self, code: u16) {
        self.code = code;
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.unit_id.to_le_bytes());
        buf.extend_from_slice(&self.code.to_le_bytes());
        buf.extend_from_slice(&self.flags.to_le_bytes());
        buf.extend_from_slice(&self.reserved.to_le_bytes());
        buf.extend_from_slice(&self.extra.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            unit_id: u16::from_le_bytes([bytes[0], bytes[1]]),
            code: u16::from_le_bytes([bytes[2], bytes[3]]),
            flags: u16::from_le_bytes([bytes[4], bytes[5]]),
            reserved: u16::from_le_bytes([bytes[6], bytes[7]]),
            extra: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        }
    }
}

// ── Mouse packet ──────────────────────────────────────────────────────────────

/// One mouse input event: 24 bytes on the wire.
///
/// Mouse button-state bits are already one distinct bit per transition, so
/// they pass into predicate space untranslated; `button_data` (wheel delta /
/// button payload) plays the role the scan code plays for keyboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MousePacket {
    /// Unit number of the originating mouse port.
    pub unit_id: u16,
    /// Movement indicator flags (relative/absolute, virtual desktop).
    pub indicator_flags: u16,
    /// Button transition bits (see [`mouse_buttons`]).
    pub button_flags: u16,
    /// Wheel delta when a wheel bit is set, otherwise button payload.
    pub button_data: u16,
    /// Raw device button state.
    pub raw_buttons: u32,
    /// Signed movement delta along X.
    pub last_x: i32,
    /// Signed movement delta along Y.
    pub last_y: i32,
    /// Device-specific extra information, passed through untouched.
    pub extra: u32,
}

impl InputPacket for MousePacket {
    const RECORD_SIZE: usize = 24;

    fn match_flags(&self) -> u16 {
        self.button_flags
    }

    fn code(&self) -> u16 {
        self.button_data
    }

    fn set_code(&mut self, code: u16) {
        self.button_data = code;
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.unit_id.to_le_bytes());
        buf.extend_from_slice(&self.indicator_flags.to_le_bytes());
        buf.extend_from_slice(&self.button_flags.to_le_bytes());
        buf.extend_from_slice(&self.button_data.to_le_bytes());
        buf.extend_from_slice(&self.raw_buttons.to_le_bytes());
        buf.extend_from_slice(&self.last_x.to_le_bytes());
        buf.extend_from_slice(&self.last_y.to_le_bytes());
        buf.extend_from_slice(&self.extra.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            unit_id: u16::from_le_bytes([bytes[0], bytes[1]]),
            indicator_flags: u16::from_le_bytes([bytes[2], bytes[3]]),
            button_flags: u16::from_le_bytes([bytes[4], bytes[5]]),
            button_data: u16::from_le_bytes([bytes[6], bytes[7]]),
            raw_buttons: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            last_x: i32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            last_y: i32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]),
            extra: u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Flag translation ──────────────────────────────────────────────────────

    #[test]
    fn test_translate_flags_maps_plain_key_down_to_down_bit() {
        // Arrange / Act
        let translated = translate_flags(0);

        // Assert
        assert_eq!(translated, predicate::KEY_DOWN);
    }

    #[test]
    fn test_translate_flags_maps_break_to_up_bit() {
        let translated = translate_flags(key_flags::KEY_BREAK);
        assert_eq!(translated, predicate::KEY_UP);
    }

    #[test]
    fn test_translate_flags_shifts_extended_bits() {
        assert_eq!(translate_flags(key_flags::KEY_E0), predicate::KEY_E0);
        assert_eq!(translate_flags(key_flags::KEY_E1), predicate::KEY_E1);
    }

    #[test]
    fn test_translate_flags_break_with_e0_keeps_both_bits() {
        let raw = key_flags::KEY_BREAK | key_flags::KEY_E0;
        let translated = translate_flags(raw);
        assert_eq!(translated, predicate::KEY_UP | predicate::KEY_E0);
    }

    // ── Keyboard packet ───────────────────────────────────────────────────────

    #[test]
    fn test_keyboard_packet_constructors_set_direction() {
        let down = KeyboardPacket::key_down(0, 0x1E);
        let up = KeyboardPacket::key_up(0, 0x1E);

        assert_eq!(down.match_flags(), predicate::KEY_DOWN);
        assert_eq!(up.match_flags(), predicate::KEY_UP);
    }

    #[test]
    fn test_keyboard_packet_wire_round_trip() {
        // Arrange
        let packet = KeyboardPacket {
            unit_id: 3,
            code: 0x45,
            flags: key_flags::KEY_BREAK | key_flags::KEY_E0,
            reserved: 0,
            extra: 0xDEAD_BEEF,
        };

        // Act
        let mut buf = Vec::new();
        packet.encode(&mut buf);
        let decoded = KeyboardPacket::decode(&buf);

        // Assert
        assert_eq!(buf.len(), KeyboardPacket::RECORD_SIZE);
        assert_eq!(decoded, packet);
    }

    // ── Mouse packet ──────────────────────────────────────────────────────────

    #[test]
    fn test_mouse_packet_wire_round_trip() {
        // Arrange – negative deltas exercise the signed fields
        let packet = MousePacket {
            unit_id: 1,
            indicator_flags: 0,
            button_flags: mouse_buttons::MOUSE_WHEEL,
            button_data: 120,
            raw_buttons: 0,
            last_x: -17,
            last_y: 4,
            extra: 0,
        };

        // Act
        let mut buf = Vec::new();
        packet.encode(&mut buf);
        let decoded = MousePacket::decode(&buf);

        // Assert
        assert_eq!(buf.len(), MousePacket::RECORD_SIZE);
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_mouse_match_flags_are_the_button_bits() {
        let packet = MousePacket {
            button_flags: mouse_buttons::LEFT_BUTTON_DOWN,
            ..MousePacket::default()
        };
        assert_eq!(packet.match_flags(), mouse_buttons::LEFT_BUTTON_DOWN);
    }
}
