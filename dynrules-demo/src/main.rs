//! `dynrules-arena [config.toml]`
//!
//! Seeds a tactic pool, lets the warrior learn in the arena and writes its
//! final script to `<prefix>_rules_<episodes>.py`.

use std::path::PathBuf;

use anyhow::Context;
use dynrules_core::config::GeneralConfig;
use dynrules_core::{RuleSet, ScriptAssembler};
use dynrules_demo::{seed_store, Arena, DemoConfig, WarriorTemplate};
use dynrules_store::{persist, populate, InMemoryRuleStore, RuleStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Starting weight of every tactic.
const INITIAL_WEIGHT: f64 = 10.0;

fn main() -> anyhow::Result<()> {
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => DemoConfig::from_file(&path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => DemoConfig::default(),
    };
    config.validate()?;
    init_tracing(&config.core.general);

    let mut store = InMemoryRuleStore::new(config.store.max_rules);
    seed_store(&mut store, INITIAL_WEIGHT)?;

    let mut set = config.core.ruleset.build(config.policy.clone())?;
    let loaded = populate(&mut set, &store)?;
    info!(rules = loaded, total_weight = set.total_weight(), "Tactics loaded");

    let seed = config.arena.seed;
    let mut arena = Arena::new(set.rules().map(|r| r.id()), seed);
    let summary = arena.run(&mut set, &config.arena, &config.core.assembler)?;
    println!(
        "{} bouts, {} deaths, {} kills; expected tactic quality {:.3} -> {:.3}",
        summary.bouts,
        summary.deaths,
        summary.kills,
        summary.effectiveness_before,
        summary.effectiveness_after
    );

    persist(&set, &mut store)?;
    print_ranking(&set, &arena);

    let mut assembler = ScriptAssembler::from_config(&mut set, &config.core.assembler)?
        .with_template(WarriorTemplate::new(&config.arena.output_prefix));
    let path = store.save_rules_hint_file(
        &config.arena.output_prefix,
        &config.arena.episodes.to_string(),
        &mut assembler,
    )?;
    println!("script written to {}", path.display());
    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(general: &GeneralConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&general.log_level));
    if general.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

fn print_ranking<P: dynrules_core::WeightPolicy>(set: &RuleSet<P>, arena: &Arena) {
    let mut rules: Vec<_> = set.rules().collect();
    rules.sort_by(|a, b| b.weight().total_cmp(&a.weight()));
    println!("{:>4}  {:>7}  {:>6}  tactic", "id", "weight", "true");
    for rule in rules {
        println!(
            "{:>4}  {:>7.2}  {:>6.3}  {}",
            rule.id(),
            rule.weight(),
            arena.effectiveness(rule.id()).unwrap_or(0.0),
            rule.payload().trim()
        );
    }
}
