//! In-memory rule store.

use dynrules_core::Rule;
use tracing::debug;

use crate::error::Result;
use crate::store::{check_capacity, RuleStore};

/// Holds rules in a `Vec` kept sorted by id. Starts with `max_rules` blank rules (ids
/// `0..max_rules`, weight 0, empty payload) for the caller to fill in.
#[derive(Debug, Clone)]
pub struct InMemoryRuleStore {
    max_rules: usize,
    rules: Vec<Rule>,
}

impl InMemoryRuleStore {
    /// Store pre-filled with `max_rules` blank rules.
    #[must_use]
    pub fn new(max_rules: usize) -> Self {
        let rules = (0..max_rules)
            .map(|i| Rule::new(i64::try_from(i).unwrap_or(i64::MAX)))
            .collect();
        Self { max_rules, rules }
    }

    /// Store seeded with `rules`; capacity is their count.
    #[must_use]
    pub fn from_rules(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(Rule::id);
        Self {
            max_rules: rules.len(),
            rules,
        }
    }

    /// Stored rules, ordered by id.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Mutable access for filling in the pre-created rules.
    pub fn rules_mut(&mut self) -> &mut [Rule] {
        &mut self.rules
    }
}

impl RuleStore for InMemoryRuleStore {
    fn max_rules(&self) -> usize {
        self.max_rules
    }

    fn load_rules(&self) -> Result<Vec<Rule>> {
        Ok(self.rules.clone())
    }

    fn load_rules_limited(&self, max_count: usize) -> Result<Vec<Rule>> {
        Ok(self.rules.iter().take(max_count).cloned().collect())
    }

    fn save_rules(&mut self, rules: &[Rule]) -> Result<()> {
        check_capacity(self.max_rules, rules.len())?;
        self.rules = rules.to_vec();
        self.rules.sort_by_key(Rule::id);
        debug!(count = rules.len(), "Rules saved in memory");
        Ok(())
    }
}
