//! Integration Tests — Warrior Arena
//!
//! Full runs of the arena loop with fixed seeds.

use dynrules_core::config::AssemblerConfig;
use dynrules_core::{Rule, RuleSet, ScriptAssembler};
use dynrules_demo::{seed_store, Arena, ArenaConfig, WarriorPolicy, WarriorTemplate};
use dynrules_store::{populate, InMemoryRuleStore, RuleStore};

fn warrior(pool: usize) -> (InMemoryRuleStore, RuleSet<WarriorPolicy>) {
    let mut store = InMemoryRuleStore::new(pool);
    seed_store(&mut store, 10.0).unwrap();
    let mut set = RuleSet::with_policy(0.0, 30.0, WarriorPolicy::default()).unwrap();
    populate(&mut set, &store).unwrap();
    (store, set)
}

fn arena_config(episodes: usize) -> ArenaConfig {
    ArenaConfig {
        episodes,
        rules_per_script: 4,
        seed: Some(42),
        report_every: 100,
        ..ArenaConfig::default()
    }
}

#[test]
fn learning_favours_effective_tactics() {
    let (_, mut set) = warrior(10);
    let mut arena = Arena::new(set.rules().map(Rule::id), Some(42));

    let summary = arena
        .run(&mut set, &arena_config(600), &AssemblerConfig::default())
        .unwrap();

    assert_eq!(summary.bouts, 600);
    assert!(
        summary.effectiveness_after > summary.effectiveness_before,
        "{} -> {}",
        summary.effectiveness_before,
        summary.effectiveness_after
    );
    for rule in set.rules() {
        assert!((0.0..=30.0).contains(&rule.weight()));
        assert!(!rule.used());
    }
    let total: f64 = set.rules().map(Rule::weight).sum();
    assert!((set.total_weight() - total).abs() < 1e-6);
}

#[test]
fn seeded_runs_are_reproducible() {
    let run = || {
        let (_, mut set) = warrior(8);
        let mut arena = Arena::new(set.rules().map(Rule::id), Some(7));
        let summary = arena
            .run(&mut set, &arena_config(100), &AssemblerConfig::default())
            .unwrap();
        let weights: Vec<f64> = set.rules().map(Rule::weight).collect();
        (summary, weights)
    };
    assert_eq!(run(), run());
}

#[test]
fn zero_episodes_changes_nothing() {
    let (_, mut set) = warrior(5);
    let mut arena = Arena::new(set.rules().map(Rule::id), Some(1));
    let summary = arena
        .run(&mut set, &arena_config(0), &AssemblerConfig::default())
        .unwrap();
    assert_eq!(summary.bouts, 0);
    assert!((summary.effectiveness_before - summary.effectiveness_after).abs() < 1e-12);
    assert!(set.rules().all(|r| (r.weight() - 10.0).abs() < f64::EPSILON));
}

#[test]
fn bad_limits_are_reported() {
    let (_, mut set) = warrior(5);
    let mut arena = Arena::new(set.rules().map(Rule::id), Some(1));
    let limits = AssemblerConfig {
        max_tries: 0,
        ..AssemblerConfig::default()
    };
    assert!(arena.run(&mut set, &arena_config(10), &limits).is_err());
}

#[test]
fn final_script_lands_in_hint_file() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("grunt");
    let prefix = prefix.to_str().unwrap();

    let (store, mut set) = warrior(4);
    let mut assembler = ScriptAssembler::new(&mut set).with_template(WarriorTemplate::new("grunt"));
    let path = store.save_rules_hint_file(prefix, "0", &mut assembler).unwrap();

    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.starts_with("# ----\n# grunt battle script\n"));
    assert!(text.contains("def act(warrior):\n    "));
    assert!(text.trim_end().ends_with("# ---- end ----"));
    assert_eq!(text.matches("    return warrior").count(), 1);
}
