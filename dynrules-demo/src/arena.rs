//! Simulated bouts and the learning loop.
//!
//! Every tactic has a hidden effectiveness in `[0, 1)`. A bout looks at the
//! tactics the current script used: the better they are on average, the
//! more likely the warrior survives and the more it kills.

use std::collections::BTreeMap;

use dynrules_core::config::AssemblerConfig;
use dynrules_core::random::{default_rng, seeded_rng};
use dynrules_core::{PlainTemplate, Result, RuleId, RuleSet, ScriptAssembler, WeightPolicy};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info};

use crate::config::ArenaConfig;

/// Kills scored per unit of average effectiveness.
const KILLS_PER_EFFECTIVENESS: f64 = 6.0;
/// Survival chance on top of the average effectiveness.
const SURVIVAL_BONUS: f64 = 0.3;

/// Result of a single bout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoutOutcome {
    /// The warrior walked out.
    Survived {
        /// Enemies defeated.
        kills: u32,
    },
    /// The warrior did not.
    Died,
}

impl BoutOutcome {
    /// Fitness handed to [`WarriorPolicy`](crate::WarriorPolicy): the kill
    /// count, or `-1` for a death.
    #[must_use]
    pub fn fitness(self) -> f64 {
        match self {
            Self::Survived { kills } => f64::from(kills),
            Self::Died => -1.0,
        }
    }
}

/// Totals over a [`Arena::run`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArenaSummary {
    /// Bouts fought.
    pub bouts: usize,
    /// Bouts lost.
    pub deaths: usize,
    /// Kills over all surviving bouts.
    pub kills: u64,
    /// Weight-averaged effectiveness before the first bout.
    pub effectiveness_before: f64,
    /// Weight-averaged effectiveness after the last bout.
    pub effectiveness_after: f64,
}

impl ArenaSummary {
    fn record(&mut self, outcome: BoutOutcome) {
        self.bouts += 1;
        match outcome {
            BoutOutcome::Survived { kills } => self.kills += u64::from(kills),
            BoutOutcome::Died => self.deaths += 1,
        }
    }
}

/// The arena: hidden tactic quality plus the dice.
#[derive(Debug)]
pub struct Arena {
    effectiveness: BTreeMap<RuleId, f64>,
    rng: StdRng,
    script_rng: StdRng,
}

impl Arena {
    /// Arena for the given tactics. A seed fixes both the hidden
    /// effectiveness and every later roll.
    pub fn new(rule_ids: impl IntoIterator<Item = RuleId>, seed: Option<u64>) -> Self {
        let (mut rng, script_rng) = match seed {
            Some(seed) => (seeded_rng(seed), seeded_rng(seed.wrapping_add(1))),
            None => (default_rng(), default_rng()),
        };
        let effectiveness = rule_ids
            .into_iter()
            .map(|id| (id, rng.gen_range(0.0..1.0)))
            .collect();
        Self {
            effectiveness,
            rng,
            script_rng,
        }
    }

    /// Hidden effectiveness of a tactic.
    #[must_use]
    pub fn effectiveness(&self, id: RuleId) -> Option<f64> {
        self.effectiveness.get(&id).copied()
    }

    /// Effectiveness averaged over the rule set, weighted by rule weight.
    /// This is what a randomly assembled script can expect.
    #[must_use]
    pub fn weighted_effectiveness<P: WeightPolicy>(&self, set: &RuleSet<P>) -> f64 {
        if set.total_weight() <= 0.0 {
            return 0.0;
        }
        let sum: f64 = set
            .rules()
            .map(|r| r.weight() * self.effectiveness(r.id()).unwrap_or(0.0))
            .sum();
        sum / set.total_weight()
    }

    /// Fight one bout with the tactics currently marked used in `set`.
    /// A warrior with an empty script always dies.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn bout<P: WeightPolicy>(&mut self, set: &RuleSet<P>) -> BoutOutcome {
        let used: Vec<f64> = set
            .rules()
            .filter(|r| r.used())
            .map(|r| self.effectiveness(r.id()).unwrap_or(0.0))
            .collect();
        if used.is_empty() {
            return BoutOutcome::Died;
        }

        let mean = used.iter().sum::<f64>() / used.len() as f64;
        if self.rng.gen_range(0.0..1.0) > mean + SURVIVAL_BONUS {
            return BoutOutcome::Died;
        }
        let kills = (mean * KILLS_PER_EFFECTIVENESS + self.rng.gen_range(0.0..1.0)).floor();
        BoutOutcome::Survived {
            kills: kills as u32,
        }
    }

    /// Run the learning loop: assemble, fight, re-weight, reset, repeat.
    ///
    /// # Errors
    /// Returns `DynrulesError::Configuration` for zero assembler limits.
    pub fn run<P>(
        &mut self,
        set: &mut RuleSet<P>,
        arena: &ArenaConfig,
        limits: &AssemblerConfig,
    ) -> Result<ArenaSummary>
    where
        P: WeightPolicy<Fitness = f64>,
    {
        limits.validate()?;
        let mut summary = ArenaSummary {
            effectiveness_before: self.weighted_effectiveness(set),
            ..ArenaSummary::default()
        };
        let mut window_kills = 0u64;
        let mut window_deaths = 0usize;

        for episode in 1..=arena.episodes {
            set.reset_used();
            let report = {
                let mut assembler =
                    ScriptAssembler::with_parts(&mut *set, &mut self.script_rng, PlainTemplate);
                assembler.set_max_tries(limits.max_tries)?;
                assembler.set_max_script_size(limits.max_script_size)?;
                assembler.assemble(arena.rules_per_script).report
            };

            let outcome = self.bout(set);
            let update = set.update_weights(&outcome.fitness());
            summary.record(outcome);
            match outcome {
                BoutOutcome::Survived { kills } => window_kills += u64::from(kills),
                BoutOutcome::Died => window_deaths += 1,
            }
            debug!(episode, rules = report.rules_written, ?outcome, ?update, "Bout");

            if arena.report_every > 0 && episode % arena.report_every == 0 {
                info!(
                    episode,
                    kills = window_kills,
                    deaths = window_deaths,
                    effectiveness = self.weighted_effectiveness(set),
                    "Arena progress"
                );
                window_kills = 0;
                window_deaths = 0;
            }
        }

        set.reset_used();
        summary.effectiveness_after = self.weighted_effectiveness(set);
        info!(
            bouts = summary.bouts,
            deaths = summary.deaths,
            kills = summary.kills,
            before = summary.effectiveness_before,
            after = summary.effectiveness_after,
            "Arena finished"
        );
        Ok(summary)
    }
}
