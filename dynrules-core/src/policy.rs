//! Reward policies — the domain half of dynamic scripting.
//!
//! A [`RuleSet`](crate::RuleSet) knows how to shift weight between used and
//! unused rules, but not how much a given outcome is worth. That is decided
//! by a [`WeightPolicy`]:
//!
//! - [`WeightPolicy::calculate_adjustment`] maps a fitness observation to the
//!   reward (positive) or penalty (negative) each used rule receives.
//! - [`WeightPolicy::distribute_remainder`] hands back the weight that was
//!   lost or gained to clamping during an update pass.
//!
//! [`NullPolicy`] is the inert base policy. [`FnPolicy`] builds one from a
//! closure.

use std::collections::btree_map;
use std::fmt;
use std::marker::PhantomData;

use crate::rule::{Rule, RuleId};

/// Mutable view over every rule of a set, in the set's stable order.
pub type RulesMut<'a> = btree_map::ValuesMut<'a, RuleId, Rule>;

/// Domain-specific reward policy injected into a [`RuleSet`](crate::RuleSet).
pub trait WeightPolicy {
    /// Outcome measure passed to [`RuleSet::update_weights`](crate::RuleSet::update_weights).
    type Fitness: ?Sized;

    /// Reward or penalty applied to every used rule. Sign and scale are
    /// domain policy.
    fn calculate_adjustment(&self, _fitness: &Self::Fitness) -> f64 {
        0.0
    }

    /// Redistribute the signed clamping spill of an update pass.
    ///
    /// `remainder` is the sum of `unclamped - clamped` over all rules: it is
    /// negative when raising weights to the lower bound added mass to the
    /// set, positive when capping at the upper bound removed mass. The set
    /// re-clamps and re-totals afterwards, so implementations may move
    /// weights freely.
    fn distribute_remainder(&self, _remainder: f64, _rules: RulesMut<'_>) {}
}

/// Policy that never adjusts anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullPolicy;

impl WeightPolicy for NullPolicy {
    type Fitness = f64;
}

/// Spread `remainder` evenly over all `rules`.
///
/// This is the usual remainder policy: every rule receives
/// `remainder / rule_count`, keeping the aggregate weight where it was before
/// clamping.
pub fn spread_evenly(remainder: f64, rules: RulesMut<'_>) {
    let count = rules.len();
    if count == 0 || remainder == 0.0 {
        return;
    }

    #[allow(clippy::cast_precision_loss)]
    let share = remainder / count as f64;
    for rule in rules {
        rule.shift_weight(share);
    }
}

/// Policy built from an adjustment closure.
///
/// ```
/// use dynrules_core::{FnPolicy, RuleSet};
///
/// // Fitness is a win ratio; above 0.5 rewards, below punishes.
/// let policy = FnPolicy::new(|ratio: &f64| (ratio - 0.5) * 10.0).spreading_remainder();
/// let set = RuleSet::with_policy(0.0, 20.0, policy)?;
/// # Ok::<(), dynrules_core::DynrulesError>(())
/// ```
pub struct FnPolicy<F, T: ?Sized> {
    adjust: F,
    spread_remainder: bool,
    _fitness: PhantomData<fn(&T)>,
}

impl<F, T> FnPolicy<F, T>
where
    F: Fn(&T) -> f64,
    T: ?Sized,
{
    /// Wrap `adjust`. The remainder is discarded unless
    /// [`spreading_remainder`](Self::spreading_remainder) is called.
    pub fn new(adjust: F) -> Self {
        Self {
            adjust,
            spread_remainder: false,
            _fitness: PhantomData,
        }
    }

    /// Spread clamping spill evenly with [`spread_evenly`].
    #[must_use]
    pub fn spreading_remainder(mut self) -> Self {
        self.spread_remainder = true;
        self
    }
}

impl<F: Clone, T: ?Sized> Clone for FnPolicy<F, T> {
    fn clone(&self) -> Self {
        Self {
            adjust: self.adjust.clone(),
            spread_remainder: self.spread_remainder,
            _fitness: PhantomData,
        }
    }
}

impl<F, T: ?Sized> fmt::Debug for FnPolicy<F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPolicy")
            .field("spread_remainder", &self.spread_remainder)
            .finish_non_exhaustive()
    }
}

impl<F, T> WeightPolicy for FnPolicy<F, T>
where
    F: Fn(&T) -> f64,
    T: ?Sized,
{
    type Fitness = T;

    fn calculate_adjustment(&self, fitness: &T) -> f64 {
        (self.adjust)(fitness)
    }

    fn distribute_remainder(&self, remainder: f64, rules: RulesMut<'_>) {
        if self.spread_remainder {
            spread_evenly(remainder, rules);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn rules(weights: &[f64]) -> BTreeMap<RuleId, Rule> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let id = RuleId(i as i64);
                (id, Rule::with_weight(id, w).unwrap())
            })
            .collect()
    }

    #[test]
    fn null_policy_is_inert() {
        let mut map = rules(&[1.0, 2.0]);
        assert!(NullPolicy.calculate_adjustment(&42.0).abs() < f64::EPSILON);
        NullPolicy.distribute_remainder(-3.0, map.values_mut());
        let weights: Vec<f64> = map.values().map(Rule::weight).collect();
        assert_eq!(weights, vec![1.0, 2.0]);
    }

    #[test]
    fn spread_evenly_shares_remainder() {
        let mut map = rules(&[4.0, 4.0, 4.0, 4.0]);
        spread_evenly(-2.0, map.values_mut());
        for rule in map.values() {
            assert!((rule.weight() - 3.5).abs() < 1e-12);
        }
        let total: f64 = map.values().map(Rule::weight).sum();
        assert!((total - 14.0).abs() < 1e-12);
    }

    #[test]
    fn spread_evenly_on_empty_is_noop() {
        let mut map = rules(&[]);
        spread_evenly(5.0, map.values_mut());
        assert!(map.is_empty());
    }

    #[test]
    fn fn_policy_calls_closure() {
        let policy = FnPolicy::new(|kills: &u32| f64::from(*kills) - 3.0);
        assert!((policy.calculate_adjustment(&5) - 2.0).abs() < 1e-12);
        assert!((policy.calculate_adjustment(&0) + 3.0).abs() < 1e-12);
    }

    #[test]
    fn fn_policy_spreads_only_when_asked() {
        let plain = FnPolicy::new(|_: &f64| 0.0);
        let mut map = rules(&[2.0, 2.0]);
        plain.distribute_remainder(2.0, map.values_mut());
        assert!(map.values().all(|r| (r.weight() - 2.0).abs() < 1e-12));

        let spreading = FnPolicy::new(|_: &f64| 0.0).spreading_remainder();
        spreading.distribute_remainder(2.0, map.values_mut());
        assert!(map.values().all(|r| (r.weight() - 3.0).abs() < 1e-12));
    }
}
