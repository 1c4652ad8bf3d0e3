//! Property-Based Tests for dynrules core
//!
//! Uses `proptest` to check the rule set and assembler invariants under
//! random inputs: weight conservation, clamping, zero-sum re-weighting,
//! script budgets and seeded reproducibility.

use proptest::prelude::*;

use dynrules_core::policy::FnPolicy;
use dynrules_core::random::seeded_rng;
use dynrules_core::{Rule, RuleId, RuleSet, ScriptAssembler, WeightPolicy, WeightUpdate};

const TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Add { id: i64, weight: f64 },
    Remove { id: i64 },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..20i64, 0.0..50.0f64).prop_map(|(id, weight)| Op::Add { id, weight }),
        1 => (0..20i64).prop_map(|id| Op::Remove { id }),
    ]
}

fn arb_bounds() -> impl Strategy<Value = (f64, f64)> {
    (0.0..20.0f64, 0.0..30.0f64).prop_map(|(lo, span)| (lo, lo + span))
}

fn sum_of_weights<P: WeightPolicy>(set: &RuleSet<P>) -> f64 {
    set.rules().map(Rule::weight).sum()
}

fn assert_invariants<P: WeightPolicy>(set: &RuleSet<P>) -> Result<(), TestCaseError> {
    prop_assert!((set.total_weight() - sum_of_weights(set)).abs() < TOLERANCE);
    for rule in set.rules() {
        prop_assert!(rule.weight() >= set.min_weight());
        prop_assert!(rule.weight() <= set.max_weight());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Property: total weight tracks membership changes
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn total_weight_conserved_across_add_remove(
        (lo, hi) in arb_bounds(),
        ops in prop::collection::vec(arb_op(), 0..80),
    ) {
        let mut set = RuleSet::new(lo, hi).unwrap();
        for op in ops {
            match op {
                Op::Add { id, weight } => {
                    set.add_rule(Rule::with_weight(id, weight).unwrap()).unwrap();
                }
                Op::Remove { id } => {
                    let present = set.contains(RuleId(id));
                    let before = set.total_weight();
                    let stored = set.find(RuleId(id)).map(Rule::weight);
                    let result = set.remove_by_id(RuleId(id));
                    prop_assert_eq!(result.is_ok(), present);
                    if let Some(w) = stored {
                        prop_assert!((before - w - set.total_weight()).abs() < TOLERANCE);
                    }
                }
            }
            assert_invariants(&set)?;
        }
    }
}

// ---------------------------------------------------------------------------
// Property: clamp invariant survives re-weighting with redistribution
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn clamp_invariant_holds_after_updates(
        (lo, hi) in arb_bounds(),
        weights in prop::collection::vec(0.0..50.0f64, 2..15),
        rounds in prop::collection::vec((-25.0..25.0f64, any::<u32>()), 1..10),
    ) {
        let policy = FnPolicy::new(|adjustment: &f64| *adjustment).spreading_remainder();
        let mut set = RuleSet::with_policy(lo, hi, policy).unwrap();
        for (i, w) in weights.iter().enumerate() {
            set.add_rule(Rule::with_weight(i as i64, *w).unwrap()).unwrap();
        }

        for (adjustment, mask) in rounds {
            set.reset_used();
            let ids: Vec<RuleId> = set.rules().map(Rule::id).collect();
            for (bit, id) in ids.iter().enumerate() {
                if mask & (1 << (bit % 32)) != 0 {
                    set.mark_used(*id).unwrap();
                }
            }
            set.update_weights(&adjustment);
            assert_invariants(&set)?;
        }
    }
}

// ---------------------------------------------------------------------------
// Property: without clamping, an update pass is zero-sum
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn unclamped_update_is_zero_sum(
        weights in prop::collection::vec(100.0..200.0f64, 2..10),
        adjustment in -10.0..10.0f64,
        used_fraction in 0.0..1.0f64,
    ) {
        let policy = FnPolicy::new(move |_: &()| adjustment);
        let mut set = RuleSet::with_policy(0.0, 1000.0, policy).unwrap();
        for (i, w) in weights.iter().enumerate() {
            set.add_rule(Rule::with_weight(i as i64, *w).unwrap()).unwrap();
        }

        let n = weights.len();
        let used = ((used_fraction * n as f64) as usize).clamp(1, n - 1);
        for id in 0..used {
            set.mark_used(RuleId(id as i64)).unwrap();
        }

        let before = set.total_weight();
        let outcome = set.update_weights(&());
        prop_assert!(outcome.is_applied());
        if let WeightUpdate::Applied { remainder, .. } = outcome {
            prop_assert!(remainder.abs() < TOLERANCE);
        }
        prop_assert!((set.total_weight() - before).abs() < TOLERANCE);
        assert_invariants(&set)?;
    }
}

// ---------------------------------------------------------------------------
// Property: no contrastive signal, no change
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn saturated_used_flags_leave_weights_alone(
        weights in prop::collection::vec(0.0..20.0f64, 1..12),
        all_used in any::<bool>(),
        adjustment in -50.0..50.0f64,
    ) {
        let policy = FnPolicy::new(move |_: &()| adjustment).spreading_remainder();
        let mut set = RuleSet::with_policy(0.0, 20.0, policy).unwrap();
        for (i, w) in weights.iter().enumerate() {
            set.add_rule(Rule::with_weight(i as i64, *w).unwrap()).unwrap();
        }
        if all_used {
            for i in 0..weights.len() {
                set.mark_used(RuleId(i as i64)).unwrap();
            }
        }

        let before: Vec<f64> = set.rules().map(Rule::weight).collect();
        let outcome = set.update_weights(&());
        prop_assert!(!outcome.is_applied());
        let after: Vec<f64> = set.rules().map(Rule::weight).collect();
        prop_assert_eq!(before, after);
    }
}

// ---------------------------------------------------------------------------
// Property: the rules section never exceeds the size budget
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn assembled_rules_respect_budget(
        payload_lens in prop::collection::vec(1..80usize, 1..20),
        budget in 1..600usize,
        slots in 0..60usize,
        seed in any::<u64>(),
    ) {
        let mut set = RuleSet::new(0.0, 10.0).unwrap();
        for (i, len) in payload_lens.iter().enumerate() {
            let rule = Rule::with_payload(i as i64, "z".repeat(*len)).weighted(1.0 + i as f64 % 5.0).unwrap();
            set.add_rule(rule).unwrap();
        }

        let mut assembler = ScriptAssembler::new(&mut set).with_rng(seeded_rng(seed));
        assembler.set_max_script_size(budget).unwrap();
        let assembly = assembler.assemble(slots);

        prop_assert!(assembly.script.len() <= budget);
        prop_assert!(assembly.report.rules_written <= slots);
        prop_assert_eq!(assembly.script.len(), assembly.report.bytes_written);
    }
}

// ---------------------------------------------------------------------------
// Property: same seed, same rule set, same script
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn seeded_assembly_is_deterministic(
        weights in prop::collection::vec(0.0..10.0f64, 1..15),
        seed in any::<u64>(),
        slots in 1..30usize,
    ) {
        let build = || {
            let mut set = RuleSet::new(0.0, 10.0).unwrap();
            for (i, w) in weights.iter().enumerate() {
                let rule = Rule::with_payload(i as i64, format!("rule_{i};")).weighted(*w).unwrap();
                set.add_rule(rule).unwrap();
            }
            set
        };

        let mut a = build();
        let mut b = build();
        let first = ScriptAssembler::new(&mut a).with_rng(seeded_rng(seed)).assemble_rules(slots);
        let second = ScriptAssembler::new(&mut b).with_rng(seeded_rng(seed)).assemble_rules(slots);
        prop_assert_eq!(first, second);

        let used_a: Vec<bool> = a.rules().map(Rule::used).collect();
        let used_b: Vec<bool> = b.rules().map(Rule::used).collect();
        prop_assert_eq!(used_a, used_b);
    }
}
