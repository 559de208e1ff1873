//! The hot-path transform applied to every packet batch before it is
//! forwarded upstream.
//!
//! [`apply`] runs while the caller holds the device lock and must stay
//! cheap: no allocation beyond what `Vec::retain` does in place, no I/O, no
//! logging above `trace!`. The consumed-count contract is the subtle part —
//! a dropped packet never reaches the upstream consumer but still counts as
//! consumed, so the caller adds the returned drop count to whatever the
//! upstream sink reports.

use hidgate_core::packet::InputPacket;
use hidgate_core::rules::FilterConfig;
use tracing::trace;

use super::rule_store::RuleStore;

/// Filters and rewrites `batch` in place under `store`'s current rules.
///
/// Returns the number of packets dropped. Surviving packets keep their
/// relative order; each is rewritten by at most the first matching modify
/// rule, evaluated against its original code.
pub fn apply<P: InputPacket>(store: &RuleStore, batch: &mut Vec<P>) -> usize {
    let original = batch.len();

    match store.filter() {
        FilterConfig::None => {}
        FilterConfig::All => {
            // The whole batch is consumed and forwarding stops.
            batch.clear();
            return original;
        }
        config => {
            batch.retain(|packet| {
                let drop = config.should_drop(packet);
                if drop {
                    trace!(code = packet.code(), flags = packet.match_flags(), "packet filtered");
                }
                !drop
            });
        }
    }
    let dropped = original - batch.len();

    let modify = store.modify();
    if !modify.is_empty() {
        for packet in batch.iter_mut() {
            // First match wins; a packet is rewritten at most once per batch,
            // never transitively against its own rewritten code.
            if let Some(rule) = modify.iter().find(|r| r.matches(packet)) {
                trace!(from = rule.from_code, to = rule.to_code, "packet modified");
                packet.set_code(rule.to_code);
            }
        }
    }

    dropped
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use hidgate_core::packet::{predicate, KeyboardPacket};
    use hidgate_core::rules::{FilterRule, ModifyRule};

    fn store_with_filter(config: FilterConfig) -> RuleStore {
        let mut store = RuleStore::new();
        store.set_filter(config);
        store
    }

    // ── Filtering semantics ───────────────────────────────────────────────────

    #[test]
    fn test_rule_drops_matching_down_packet_and_counts_it() {
        // Arrange
        let store = store_with_filter(FilterConfig::Rules(vec![FilterRule {
            flag_predicates: predicate::KEY_DOWN,
            scan_code: 5,
        }]));
        let mut batch = vec![KeyboardPacket::key_down(0, 5)];

        // Act
        let dropped = apply(&store, &mut batch);

        // Assert
        assert_eq!(dropped, 1);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_rule_passes_same_code_opposite_direction() {
        let store = store_with_filter(FilterConfig::Rules(vec![FilterRule {
            flag_predicates: predicate::KEY_DOWN,
            scan_code: 5,
        }]));
        let mut batch = vec![KeyboardPacket::key_up(0, 5)];

        let dropped = apply(&store, &mut batch);

        assert_eq!(dropped, 0);
        assert_eq!(batch, vec![KeyboardPacket::key_up(0, 5)]);
    }

    #[test]
    fn test_rule_passes_other_code_same_direction() {
        let store = store_with_filter(FilterConfig::Rules(vec![FilterRule {
            flag_predicates: predicate::KEY_DOWN,
            scan_code: 5,
        }]));
        let mut batch = vec![KeyboardPacket::key_down(0, 6)];

        assert_eq!(apply(&store, &mut batch), 0);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_all_mode_consumes_entire_batch() {
        let store = store_with_filter(FilterConfig::All);
        let mut batch = vec![
            KeyboardPacket::key_down(0, 1),
            KeyboardPacket::key_up(0, 1),
            KeyboardPacket::key_down(0, 2),
        ];

        let dropped = apply(&store, &mut batch);

        assert_eq!(dropped, 3);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_flags_mode_uses_single_mask_without_scan_codes() {
        // Drop every release, keep every press, regardless of code.
        let store = store_with_filter(FilterConfig::Flags(predicate::KEY_UP));
        let mut batch = vec![
            KeyboardPacket::key_down(0, 30),
            KeyboardPacket::key_up(0, 30),
            KeyboardPacket::key_up(0, 31),
        ];

        let dropped = apply(&store, &mut batch);

        assert_eq!(dropped, 2);
        assert_eq!(batch, vec![KeyboardPacket::key_down(0, 30)]);
    }

    #[test]
    fn test_batch_compaction_preserves_survivor_order() {
        // Arrange – batch [A(drop), B(keep), C(drop), D(keep)]
        let store = store_with_filter(FilterConfig::Rules(vec![
            FilterRule {
                flag_predicates: predicate::ANY,
                scan_code: 0xA,
            },
            FilterRule {
                flag_predicates: predicate::ANY,
                scan_code: 0xC,
            },
        ]));
        let mut batch = vec![
            KeyboardPacket::key_down(0, 0xA),
            KeyboardPacket::key_down(0, 0xB),
            KeyboardPacket::key_down(0, 0xC),
            KeyboardPacket::key_down(0, 0xD),
        ];

        // Act
        let dropped = apply(&store, &mut batch);

        // Assert – survivors [B, D] in order, all four counted against the batch
        assert_eq!(dropped, 2);
        assert_eq!(
            batch,
            vec![
                KeyboardPacket::key_down(0, 0xB),
                KeyboardPacket::key_down(0, 0xD),
            ]
        );
    }

    #[test]
    fn test_single_packet_batch_filtered_to_empty() {
        let store = store_with_filter(FilterConfig::Rules(vec![FilterRule {
            flag_predicates: predicate::ANY,
            scan_code: 9,
        }]));
        let mut batch = vec![KeyboardPacket::key_down(0, 9)];

        assert_eq!(apply(&store, &mut batch), 1);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_none_mode_passes_everything_untouched() {
        let store = RuleStore::new();
        let mut batch = vec![KeyboardPacket::key_down(0, 1), KeyboardPacket::key_up(0, 1)];

        assert_eq!(apply(&store, &mut batch), 0);
        assert_eq!(batch.len(), 2);
    }

    // ── Modify semantics ──────────────────────────────────────────────────────

    #[test]
    fn test_modify_rewrites_matching_code() {
        let mut store = RuleStore::new();
        store.set_modify(vec![ModifyRule {
            flag_predicates: predicate::ANY,
            from_code: 3,
            to_code: 4,
        }]);
        let mut batch = vec![KeyboardPacket::key_down(0, 3)];

        apply(&store, &mut batch);

        assert_eq!(batch[0].code, 4);
    }

    #[test]
    fn test_modify_does_not_chain_within_one_pass() {
        // Rules 3→4 and 4→5: a packet starting at 3 must stop at 4.
        let mut store = RuleStore::new();
        store.set_modify(vec![
            ModifyRule {
                flag_predicates: predicate::ANY,
                from_code: 3,
                to_code: 4,
            },
            ModifyRule {
                flag_predicates: predicate::ANY,
                from_code: 4,
                to_code: 5,
            },
        ]);
        let mut batch = vec![
            KeyboardPacket::key_down(0, 3),
            KeyboardPacket::key_down(0, 4),
        ];

        apply(&store, &mut batch);

        assert_eq!(batch[0].code, 4, "first packet rewritten once, not chained to 5");
        assert_eq!(batch[1].code, 5, "second packet matched the 4→5 rule directly");
    }

    #[test]
    fn test_modify_first_match_wins_in_list_order() {
        let mut store = RuleStore::new();
        store.set_modify(vec![
            ModifyRule {
                flag_predicates: predicate::ANY,
                from_code: 7,
                to_code: 8,
            },
            ModifyRule {
                flag_predicates: predicate::ANY,
                from_code: 7,
                to_code: 9,
            },
        ]);
        let mut batch = vec![KeyboardPacket::key_down(0, 7)];

        apply(&store, &mut batch);

        assert_eq!(batch[0].code, 8);
    }

    #[test]
    fn test_modify_respects_flag_predicate() {
        let mut store = RuleStore::new();
        store.set_modify(vec![ModifyRule {
            flag_predicates: predicate::KEY_DOWN,
            from_code: 3,
            to_code: 4,
        }]);
        let mut batch = vec![KeyboardPacket::key_up(0, 3)];

        apply(&store, &mut batch);

        assert_eq!(batch[0].code, 3, "release does not match a down-only predicate");
    }

    #[test]
    fn test_filter_runs_before_modify() {
        // A packet dropped by the filter never reaches the modify pass.
        let mut store = RuleStore::new();
        store.set_filter(FilterConfig::Rules(vec![FilterRule {
            flag_predicates: predicate::ANY,
            scan_code: 3,
        }]));
        store.set_modify(vec![ModifyRule {
            flag_predicates: predicate::ANY,
            from_code: 3,
            to_code: 4,
        }]);
        let mut batch = vec![KeyboardPacket::key_down(0, 3)];

        let dropped = apply(&store, &mut batch);

        assert_eq!(dropped, 1);
        assert!(batch.is_empty());
    }
}
