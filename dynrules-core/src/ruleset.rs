//! RuleSet — weighted rule population with adaptive re-weighting.
//!
//! Invariants maintained by every operation:
//!
//! - `min_weight <= rule.weight <= max_weight` for every member
//! - `total_weight == Σ rule.weight` (to floating tolerance)
//! - rules are iterated in ascending id order, so sampling over the set is
//!   reproducible
//!
//! The re-weighting pass follows Spronck et al. (2005), "Adaptive Game AI
//! with Dynamic Scripting": used rules receive the policy's adjustment,
//! unused rules share an equal and opposite compensation, weights are
//! clamped, and the clamping spill is handed to the policy for
//! redistribution.

use std::collections::BTreeMap;
use std::collections::btree_map;

use tracing::{debug, trace, warn};

use crate::error::{DynrulesError, Result};
use crate::policy::{NullPolicy, WeightPolicy};
use crate::rule::{validate_weight, Rule, RuleId};

/// Why an update pass left every weight untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The set holds no rules.
    Empty,
    /// No rule is marked used.
    NoneUsed,
    /// Every rule is marked used, so there is nothing to compensate.
    AllUsed,
    /// The policy returned NaN or an infinite adjustment.
    NonFiniteAdjustment,
}

/// Result of [`RuleSet::update_weights`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightUpdate {
    /// No contrastive signal; weights unchanged.
    Skipped(SkipReason),
    /// Weights were adjusted.
    Applied {
        /// Number of used rules.
        used: usize,
        /// Delta applied to each used rule.
        adjustment: f64,
        /// Delta applied to each unused rule.
        compensation: f64,
        /// Signed clamping spill handed to the policy.
        remainder: f64,
    },
}

impl WeightUpdate {
    /// Whether the pass changed anything.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Ordered collection of [`Rule`]s with weight bounds and a reward policy.
#[derive(Debug, Clone)]
pub struct RuleSet<P: WeightPolicy = NullPolicy> {
    min_weight: f64,
    max_weight: f64,
    total_weight: f64,
    rules: BTreeMap<RuleId, Rule>,
    policy: P,
}

impl RuleSet<NullPolicy> {
    /// Create an empty set with the inert [`NullPolicy`].
    ///
    /// # Errors
    /// Returns [`DynrulesError::InvalidArgument`] if the bounds are negative,
    /// not finite, or `min_weight > max_weight`.
    pub fn new(min_weight: f64, max_weight: f64) -> Result<Self> {
        Self::with_policy(min_weight, max_weight, NullPolicy)
    }
}

impl<P: WeightPolicy> RuleSet<P> {
    /// Create an empty set driven by `policy`.
    ///
    /// # Errors
    /// Returns [`DynrulesError::InvalidArgument`] if the bounds are negative,
    /// not finite, or `min_weight > max_weight`.
    pub fn with_policy(min_weight: f64, max_weight: f64, policy: P) -> Result<Self> {
        validate_bound("min_weight", min_weight)?;
        validate_bound("max_weight", max_weight)?;
        if min_weight > max_weight {
            return Err(DynrulesError::InvalidArgument(format!(
                "max_weight ({max_weight}) must not be smaller than min_weight ({min_weight})"
            )));
        }
        Ok(Self {
            min_weight,
            max_weight,
            total_weight: 0.0,
            rules: BTreeMap::new(),
            policy,
        })
    }

    // ------------------------------------------------------------------
    // Bounds
    // ------------------------------------------------------------------

    /// Lower weight bound.
    #[must_use]
    pub fn min_weight(&self) -> f64 {
        self.min_weight
    }

    /// Upper weight bound.
    #[must_use]
    pub fn max_weight(&self) -> f64 {
        self.max_weight
    }

    /// Change the lower bound and re-clamp every member.
    ///
    /// # Errors
    /// Returns [`DynrulesError::InvalidArgument`] if `min_weight` is negative,
    /// not finite, or greater than the current upper bound.
    pub fn set_min_weight(&mut self, min_weight: f64) -> Result<()> {
        validate_bound("min_weight", min_weight)?;
        if min_weight > self.max_weight {
            return Err(DynrulesError::InvalidArgument(format!(
                "min_weight ({min_weight}) must not exceed max_weight ({})",
                self.max_weight
            )));
        }
        self.min_weight = min_weight;
        self.total_weight = self.clamp_all();
        Ok(())
    }

    /// Change the upper bound and re-clamp every member.
    ///
    /// # Errors
    /// Returns [`DynrulesError::InvalidArgument`] if `max_weight` is negative,
    /// not finite, or smaller than the current lower bound.
    pub fn set_max_weight(&mut self, max_weight: f64) -> Result<()> {
        validate_bound("max_weight", max_weight)?;
        if max_weight < self.min_weight {
            return Err(DynrulesError::InvalidArgument(format!(
                "max_weight ({max_weight}) must not be smaller than min_weight ({})",
                self.min_weight
            )));
        }
        self.max_weight = max_weight;
        self.total_weight = self.clamp_all();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Insert `rule`, clamping its weight into the set's bounds.
    ///
    /// A member with the same id is replaced and returned; its weight leaves
    /// the total and the new (clamped) weight enters it.
    ///
    /// # Errors
    /// Returns [`DynrulesError::InvalidArgument`] if the rule's weight is
    /// negative or not finite.
    pub fn add_rule(&mut self, mut rule: Rule) -> Result<Option<Rule>> {
        validate_weight(rule.weight())?;

        let clamped = self.clamp(rule.weight());
        rule.put_weight(clamped);
        self.total_weight += clamped;

        let id = rule.id();
        let replaced = self.rules.insert(id, rule);
        if let Some(old) = &replaced {
            self.total_weight -= old.weight();
            trace!(rule = %id, old = old.weight(), new = clamped, "Replaced rule");
        } else {
            trace!(rule = %id, weight = clamped, "Added rule");
        }
        Ok(replaced)
    }

    /// Remove the member equal to `rule` (same id).
    ///
    /// # Errors
    /// Returns [`DynrulesError::NotFound`] if no member has that id.
    pub fn remove_rule(&mut self, rule: &Rule) -> Result<Rule> {
        self.remove_by_id(rule.id())
    }

    /// Remove the member with `id`, subtracting its stored weight.
    ///
    /// # Errors
    /// Returns [`DynrulesError::NotFound`] if no member has that id.
    pub fn remove_by_id(&mut self, id: RuleId) -> Result<Rule> {
        let removed = self.rules.remove(&id).ok_or(DynrulesError::NotFound(id))?;
        if self.rules.is_empty() {
            self.total_weight = 0.0;
        } else {
            self.total_weight -= removed.weight();
        }
        trace!(rule = %id, weight = removed.weight(), "Removed rule");
        Ok(removed)
    }

    /// Look up a member by id.
    #[must_use]
    pub fn find(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    /// Whether a member with `id` exists.
    #[must_use]
    pub fn contains(&self, id: RuleId) -> bool {
        self.rules.contains_key(&id)
    }

    /// Drop every rule and reset the total to zero.
    pub fn clear(&mut self) {
        self.rules.clear();
        self.total_weight = 0.0;
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Sum of all member weights. O(1).
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Members in ascending id order.
    ///
    /// The iterator is lazy and `Clone`, so a walk can be restarted from a
    /// saved copy.
    pub fn rules(&self) -> btree_map::Values<'_, RuleId, Rule> {
        self.rules.values()
    }

    // ------------------------------------------------------------------
    // Per-rule mutation
    // ------------------------------------------------------------------

    /// Set a member's weight, clamped into the bounds. Returns the weight
    /// actually stored.
    ///
    /// # Errors
    /// [`DynrulesError::InvalidArgument`] for a negative or non-finite
    /// weight, [`DynrulesError::NotFound`] for an unknown id.
    pub fn set_rule_weight(&mut self, id: RuleId, weight: f64) -> Result<f64> {
        validate_weight(weight)?;
        let clamped = self.clamp(weight);
        let rule = self.rules.get_mut(&id).ok_or(DynrulesError::NotFound(id))?;
        self.total_weight += clamped - rule.weight();
        rule.put_weight(clamped);
        Ok(clamped)
    }

    /// Replace a member's payload.
    ///
    /// # Errors
    /// Returns [`DynrulesError::NotFound`] for an unknown id.
    pub fn set_rule_payload(&mut self, id: RuleId, payload: impl Into<String>) -> Result<()> {
        let rule = self.rules.get_mut(&id).ok_or(DynrulesError::NotFound(id))?;
        rule.set_payload(payload);
        Ok(())
    }

    /// Set or clear a member's used flag.
    ///
    /// # Errors
    /// Returns [`DynrulesError::NotFound`] for an unknown id.
    pub fn set_used(&mut self, id: RuleId, used: bool) -> Result<()> {
        let rule = self.rules.get_mut(&id).ok_or(DynrulesError::NotFound(id))?;
        rule.set_used(used);
        Ok(())
    }

    /// Mark a member as used.
    ///
    /// # Errors
    /// Returns [`DynrulesError::NotFound`] for an unknown id.
    pub fn mark_used(&mut self, id: RuleId) -> Result<()> {
        self.set_used(id, true)
    }

    /// Clear every used flag. The set never does this on its own.
    pub fn reset_used(&mut self) {
        for rule in self.rules.values_mut() {
            rule.set_used(false);
        }
    }

    /// Number of members currently marked used.
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.rules.values().filter(|r| r.used()).count()
    }

    // ------------------------------------------------------------------
    // Policy
    // ------------------------------------------------------------------

    /// The injected reward policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Mutable access to the reward policy.
    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    /// Reward for each used rule, as computed by the policy.
    pub fn calculate_adjustment(&self, fitness: &P::Fitness) -> f64 {
        self.policy.calculate_adjustment(fitness)
    }

    /// Hand `remainder` to the policy, then restore the invariants.
    pub fn distribute_remainder(&mut self, remainder: f64) {
        self.policy.distribute_remainder(remainder, self.rules.values_mut());
        self.total_weight = self.clamp_all();
    }

    /// Adapt weights to an observed outcome.
    ///
    /// Used rules receive `adjustment = policy(fitness)`; every unused rule
    /// receives `-(used · adjustment) / unused`, so before clamping the pass
    /// is zero-sum. Each result is clamped into the bounds and the signed
    /// spill is accumulated and passed to the policy. The total is
    /// recomputed afterwards since the policy may touch any weight.
    ///
    /// With no rules, no used rules, or only used rules there is no
    /// contrastive signal and nothing changes.
    pub fn update_weights(&mut self, fitness: &P::Fitness) -> WeightUpdate {
        let count = self.rules.len();
        if count == 0 {
            return WeightUpdate::Skipped(SkipReason::Empty);
        }
        let used = self.used_count();
        if used == 0 {
            return WeightUpdate::Skipped(SkipReason::NoneUsed);
        }
        if used == count {
            return WeightUpdate::Skipped(SkipReason::AllUsed);
        }

        let adjustment = self.policy.calculate_adjustment(fitness);
        if !adjustment.is_finite() {
            warn!(adjustment, "Policy returned a non-finite adjustment, skipping update");
            return WeightUpdate::Skipped(SkipReason::NonFiniteAdjustment);
        }

        let non_active = count - used;
        #[allow(clippy::cast_precision_loss)]
        let compensation = -(used as f64 * adjustment) / non_active as f64;

        let (min, max) = (self.min_weight, self.max_weight);
        let mut remainder = 0.0;
        let mut total = 0.0;
        for rule in self.rules.values_mut() {
            let delta = if rule.used() { adjustment } else { compensation };
            let weight = rule.weight() + delta;
            let clamped = weight.clamp(min, max);
            remainder += weight - clamped;
            rule.put_weight(clamped);
            total += clamped;
        }
        self.total_weight = total;

        self.distribute_remainder(remainder);

        debug!(
            rules = count,
            used,
            adjustment,
            compensation,
            remainder,
            total_weight = self.total_weight,
            "Updated rule weights"
        );

        WeightUpdate::Applied {
            used,
            adjustment,
            compensation,
            remainder,
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Mutable member access for flag updates inside the crate. Weight
    /// changes must go through the set so the total stays exact.
    pub(crate) fn rule_mut(&mut self, id: RuleId) -> Option<&mut Rule> {
        self.rules.get_mut(&id)
    }

    fn clamp(&self, weight: f64) -> f64 {
        weight.clamp(self.min_weight, self.max_weight)
    }

    /// Clamp every member into the bounds and return the new total.
    fn clamp_all(&mut self) -> f64 {
        let (min, max) = (self.min_weight, self.max_weight);
        let mut total = 0.0;
        for rule in self.rules.values_mut() {
            let weight = if rule.weight().is_nan() { min } else { rule.weight() };
            let clamped = weight.clamp(min, max);
            rule.put_weight(clamped);
            total += clamped;
        }
        total
    }
}

impl<'a, P: WeightPolicy> IntoIterator for &'a RuleSet<P> {
    type Item = &'a Rule;
    type IntoIter = btree_map::Values<'a, RuleId, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.values()
    }
}

fn validate_bound(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(DynrulesError::InvalidArgument(format!(
            "{name} must be a finite, non-negative number, got {value}"
        )));
    }
    Ok(())
}
