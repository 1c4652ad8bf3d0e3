//! Reward shaping for the warrior.

use dynrules_core::policy::{spread_evenly, RulesMut};
use dynrules_core::WeightPolicy;
use serde::{Deserialize, Serialize};

/// Scores a bout by kills.
///
/// The fitness value is the kill count of a bout, or a negative number when
/// the warrior died. Kills above `break_even` reward the rules used in the
/// script, fewer kills punish them, and a death punishes them by
/// `value * death_penalty`. Whatever the clamp to the weight bounds cuts
/// off is spread evenly over the whole rule set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarriorPolicy {
    /// Kill count that leaves weights unchanged.
    #[serde(default = "default_break_even")]
    pub break_even: f64,
    /// Weight change per kill above or below `break_even`.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Multiplier applied to the (negative) value of a death.
    #[serde(default = "default_death_penalty")]
    pub death_penalty: f64,
}

impl Default for WarriorPolicy {
    fn default() -> Self {
        Self {
            break_even: default_break_even(),
            scale: default_scale(),
            death_penalty: default_death_penalty(),
        }
    }
}

impl WeightPolicy for WarriorPolicy {
    type Fitness = f64;

    fn calculate_adjustment(&self, fitness: &f64) -> f64 {
        let value = *fitness;
        if value < 0.0 {
            return value * self.death_penalty;
        }
        (value - self.break_even) * self.scale
    }

    fn distribute_remainder(&self, remainder: f64, rules: RulesMut<'_>) {
        spread_evenly(remainder, rules);
    }
}

fn default_break_even() -> f64 {
    3.0
}
fn default_scale() -> f64 {
    1.0
}
fn default_death_penalty() -> f64 {
    2.0
}
