//! Per-device rule storage: one filter configuration and one modify list,
//! always mutated as a unit under the owning device's lock.
//!
//! The store itself is lock-free; [`super::device::DeviceContext`] wraps it
//! in a `Mutex` and every caller runs through that. Add/remove operations
//! are read-modify-writes over the snapshot contract and must happen inside
//! a single critical section — which they do, because each is one `&mut
//! self` method. They are never assembled from two independently locked
//! get+set calls.

use hidgate_core::rules::{FilterConfig, FilterMode, FilterRule, ModifyRule};
use tracing::debug;

/// Truncated view of the filter configuration.
///
/// `flag_or_count` keeps the wire protocol's mode-dependent reading: the
/// *true* rule count in `FlagAndScanCode` mode (which may exceed
/// `rules.len()` after truncation), the flag mask in `Flags` mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSnapshot {
    pub mode: FilterMode,
    pub flag_or_count: u16,
    pub rules: Vec<FilterRule>,
}

/// Truncated view of the modify list; `true_count` is the full list length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifySnapshot {
    pub true_count: u16,
    pub rules: Vec<ModifyRule>,
}

/// A device's mutable rule state.
#[derive(Debug, Default)]
pub struct RuleStore {
    filter: FilterConfig,
    modify: Vec<ModifyRule>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current filter configuration.
    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    /// The current modify list; empty means "no modification".
    pub fn modify(&self) -> &[ModifyRule] {
        &self.modify
    }

    /// Replaces the entire filter configuration. The previous mode's data is
    /// discarded wholesale.
    pub fn set_filter(&mut self, config: FilterConfig) {
        debug!(mode = ?config.mode(), flag_or_count = config.flag_or_count(), "filter replaced");
        self.filter = config;
    }

    /// Snapshot read of the filter configuration, with the rule list capped
    /// to `max_rules`. Callers that receive a truncated prefix can reissue
    /// with a buffer sized from `flag_or_count`.
    pub fn filter_snapshot(&self, max_rules: usize) -> FilterSnapshot {
        let rules = self.filter.rules();
        FilterSnapshot {
            mode: self.filter.mode(),
            flag_or_count: self.filter.flag_or_count(),
            rules: rules[..rules.len().min(max_rules)].to_vec(),
        }
    }

    /// Replaces the modify list.
    pub fn set_modify(&mut self, rules: Vec<ModifyRule>) {
        debug!(count = rules.len(), "modify list replaced");
        self.modify = rules;
    }

    /// Snapshot read of the modify list, capped to `max_rules`.
    pub fn modify_snapshot(&self, max_rules: usize) -> ModifySnapshot {
        ModifySnapshot {
            true_count: self.modify.len() as u16,
            rules: self.modify[..self.modify.len().min(max_rules)].to_vec(),
        }
    }

    /// Adds one filter rule, idempotently.
    ///
    /// If the store is not in `FlagAndScanCode` mode the previous
    /// configuration is discarded and the list starts fresh with just this
    /// rule. An identical (predicate, scan code) pair is left alone.
    pub fn add_filter_rule(&mut self, rule: FilterRule) {
        match &mut self.filter {
            FilterConfig::Rules(rules) => {
                if !rules.contains(&rule) {
                    rules.push(rule);
                }
            }
            _ => {
                self.filter = FilterConfig::Rules(vec![rule]);
            }
        }
    }

    /// Removes every filter rule equal to `rule`. Succeeds as a no-op when
    /// nothing matches or the store is not in `FlagAndScanCode` mode.
    pub fn remove_filter_rule(&mut self, rule: FilterRule) {
        if let FilterConfig::Rules(rules) = &mut self.filter {
            rules.retain(|r| *r != rule);
        }
    }

    /// Adds one modify rule, idempotently on the full
    /// (predicate, from, to) triple.
    pub fn add_modify_rule(&mut self, rule: ModifyRule) {
        if !self.modify.contains(&rule) {
            self.modify.push(rule);
        }
    }

    /// Removes every modify rule equal to `rule`; a no-op success when
    /// nothing matches.
    pub fn remove_modify_rule(&mut self, rule: ModifyRule) {
        self.modify.retain(|r| *r != rule);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
