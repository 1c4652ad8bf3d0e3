//! Rule — an identified, weighted, opaque behavior fragment.
//!
//! The payload is never interpreted by this crate: it is the text an
//! assembler concatenates into a script. Whatever language the payload is
//! written in is the host's business.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{DynrulesError, Result};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identifier of a rule, unique within a [`RuleSet`](crate::RuleSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct RuleId(pub i64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RuleId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<i32> for RuleId {
    fn from(id: i32) -> Self {
        Self(i64::from(id))
    }
}

impl From<u32> for RuleId {
    fn from(id: u32) -> Self {
        Self(i64::from(id))
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A weighted behavior fragment.
///
/// Equality and hashing look at the id only: two rules with the same id are
/// the same rule for membership purposes, whatever their weight or payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "StoredRule")]
pub struct Rule {
    id: RuleId,
    weight: f64,
    #[serde(skip)]
    used: bool,
    #[serde(default, rename = "code")]
    payload: String,
}

impl Rule {
    /// Create a blank rule: zero weight, unused, empty payload.
    #[must_use]
    pub fn new(id: impl Into<RuleId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Create a zero-weight rule carrying `payload`.
    #[must_use]
    pub fn with_payload(id: impl Into<RuleId>, payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            ..Self::new(id)
        }
    }

    /// Create a rule with an initial weight.
    ///
    /// # Errors
    /// Returns [`DynrulesError::InvalidArgument`] if `weight` is negative or
    /// not finite.
    pub fn with_weight(id: impl Into<RuleId>, weight: f64) -> Result<Self> {
        let mut rule = Self::new(id);
        rule.set_weight(weight)?;
        Ok(rule)
    }

    /// Builder-style weight setter.
    ///
    /// # Errors
    /// Same as [`Rule::set_weight`].
    pub fn weighted(mut self, weight: f64) -> Result<Self> {
        self.set_weight(weight)?;
        Ok(self)
    }

    /// The rule's identifier. Fixed for the lifetime of the rule.
    #[must_use]
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// Current selection weight.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Set the selection weight.
    ///
    /// A rule held by a [`RuleSet`](crate::RuleSet) is only reachable through
    /// the set's API, so weights changed here never bypass the set's bounds.
    ///
    /// # Errors
    /// Returns [`DynrulesError::InvalidArgument`] if `weight` is negative or
    /// not finite.
    pub fn set_weight(&mut self, weight: f64) -> Result<()> {
        validate_weight(weight)?;
        self.weight = weight;
        Ok(())
    }

    /// Add `delta` to the weight, flooring the result at zero.
    ///
    /// Meant for remainder-distribution policies, which work with signed
    /// spill amounts.
    pub fn shift_weight(&mut self, delta: f64) {
        self.weight = (self.weight + delta).max(0.0);
    }

    /// Whether the rule was selected during the last assembly pass.
    #[must_use]
    pub fn used(&self) -> bool {
        self.used
    }

    /// Set or clear the used flag.
    pub fn set_used(&mut self, used: bool) {
        self.used = used;
    }

    /// The opaque payload.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Replace the payload.
    pub fn set_payload(&mut self, payload: impl Into<String>) {
        self.payload = payload.into();
    }

    /// Size of the payload in bytes, as counted against script budgets.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Overwrite the weight without validation. Callers guarantee bounds.
    pub(crate) fn put_weight(&mut self, weight: f64) {
        self.weight = weight;
    }
}

/// Wire shape of a [`Rule`]; converted through [`Rule::set_weight`] so a
/// stored weight is validated like any other.
#[derive(Deserialize)]
struct StoredRule {
    id: RuleId,
    #[serde(default)]
    weight: f64,
    #[serde(default)]
    code: String,
}

impl TryFrom<StoredRule> for Rule {
    type Error = DynrulesError;

    fn try_from(stored: StoredRule) -> Result<Self> {
        Rule::with_payload(stored.id, stored.code).weighted(stored.weight)
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Reject weights that cannot be selection mass.
pub(crate) fn validate_weight(weight: f64) -> Result<()> {
    if !weight.is_finite() {
        return Err(DynrulesError::InvalidArgument(format!(
            "weight must be finite, got {weight}"
        )));
    }
    if weight < 0.0 {
        return Err(DynrulesError::InvalidArgument(format!(
            "weight must not be negative, got {weight}"
        )));
    }
    Ok(())
}
