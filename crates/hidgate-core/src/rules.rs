//! Filter and modify rule records and the per-device filter configuration.
//!
//! A filter rule drops matching packets; a modify rule rewrites the packet's
//! code field. Both match the same way: the rule's flag mask must intersect
//! the packet's predicate-space flags *and* the code field must be equal.

use serde::{Deserialize, Serialize};

use crate::packet::InputPacket;

// ── Rule records ──────────────────────────────────────────────────────────────

/// Drops packets whose predicate flags intersect `flag_predicates` and whose
/// code equals `scan_code`. 4 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Predicate-space flag mask; any shared bit counts as a match.
    pub flag_predicates: u16,
    /// Code of the packets to drop.
    pub scan_code: u16,
}

impl FilterRule {
    /// Returns `true` if `packet` should be dropped by this rule.
    pub fn matches<P: InputPacket>(&self, packet: &P) -> bool {
        (packet.match_flags() & self.flag_predicates) != 0 && packet.code() == self.scan_code
    }
}

/// Rewrites the code of packets whose predicate flags intersect
/// `flag_predicates` and whose code equals `from_code`. 6 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyRule {
    /// Predicate-space flag mask; any shared bit counts as a match.
    pub flag_predicates: u16,
    /// Code to rewrite from.
    pub from_code: u16,
    /// Code to rewrite to.
    pub to_code: u16,
}

impl ModifyRule {
    /// Returns `true` if `packet` should be rewritten by this rule.
    pub fn matches<P: InputPacket>(&self, packet: &P) -> bool {
        (packet.match_flags() & self.flag_predicates) != 0 && packet.code() == self.from_code
    }
}

// ── Filter mode ───────────────────────────────────────────────────────────────

/// Which filtering strategy a device is running. Exactly one is active at a
/// time; switching discards the previous mode's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum FilterMode {
    /// Filter nothing.
    None = 0x0000,
    /// Drop any packet whose predicate flags intersect a single stored mask.
    Flags = 0x0001,
    /// Drop packets matching any rule in an ordered [`FilterRule`] list.
    FlagAndScanCode = 0x0002,
    /// Drop everything.
    All = 0xFFFF,
}

impl TryFrom<u16> for FilterMode {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, ()> {
        match value {
            0x0000 => Ok(FilterMode::None),
            0x0001 => Ok(FilterMode::Flags),
            0x0002 => Ok(FilterMode::FlagAndScanCode),
            0xFFFF => Ok(FilterMode::All),
            _ => Err(()),
        }
    }
}

// ── Filter configuration ──────────────────────────────────────────────────────

/// A device's complete filter configuration.
///
/// On the wire the header field after the mode is *mode-dependent*: it holds
/// the flag mask in `Flags` mode and the rule count in `FlagAndScanCode`
/// mode. [`FilterConfig::flag_or_count`] reproduces that dual reading; the
/// enum keeps the two meanings apart in memory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterConfig {
    /// Filter nothing.
    #[default]
    None,
    /// Drop everything.
    All,
    /// Drop packets whose predicate flags intersect the mask.
    Flags(u16),
    /// Drop packets matching any rule in the list, in list order.
    Rules(Vec<FilterRule>),
}

impl FilterConfig {
    /// The wire-level mode discriminator for this configuration.
    pub fn mode(&self) -> FilterMode {
        match self {
            FilterConfig::None => FilterMode::None,
            FilterConfig::All => FilterMode::All,
            FilterConfig::Flags(_) => FilterMode::Flags,
            FilterConfig::Rules(_) => FilterMode::FlagAndScanCode,
        }
    }

    /// The mode-dependent header field: flag mask in `Flags` mode, rule count
    /// in `FlagAndScanCode` mode, zero otherwise.
    pub fn flag_or_count(&self) -> u16 {
        match self {
            FilterConfig::None | FilterConfig::All => 0,
            FilterConfig::Flags(mask) => *mask,
            FilterConfig::Rules(rules) => rules.len() as u16,
        }
    }

    /// The rule list, empty unless in `FlagAndScanCode` mode.
    pub fn rules(&self) -> &[FilterRule] {
        match self {
            FilterConfig::Rules(rules) => rules,
            _ => &[],
        }
    }

    /// Returns `true` if `packet` should be dropped under this configuration.
    pub fn should_drop<P: InputPacket>(&self, packet: &P) -> bool {
        match self {
            FilterConfig::None => false,
            FilterConfig::All => true,
            FilterConfig::Flags(mask) => (packet.match_flags() & mask) != 0,
            FilterConfig::Rules(rules) => rules.iter().any(|r| r.matches(packet)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
