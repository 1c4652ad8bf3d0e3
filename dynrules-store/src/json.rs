//! Rule store backed by a single JSON file.

use std::path::{Path, PathBuf};

use dynrules_core::Rule;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::store::{check_capacity, RuleStore};

/// Keeps rules as a pretty-printed JSON array. A missing file loads as an
/// empty store; saves go through a temporary file and a rename.
#[derive(Debug, Clone)]
pub struct JsonRuleStore {
    path: PathBuf,
    max_rules: usize,
}

impl JsonRuleStore {
    /// Store at `path` managing up to `max_rules` rules.
    pub fn new(path: impl Into<PathBuf>, max_rules: usize) -> Self {
        Self {
            path: path.into(),
            max_rules,
        }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleStore for JsonRuleStore {
    fn max_rules(&self) -> usize {
        self.max_rules
    }

    fn load_rules(&self) -> Result<Vec<Rule>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No rule file yet");
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&self.path)?;
        let mut rules: Vec<Rule> =
            serde_json::from_str(&text).map_err(|e| StoreError::Serialization(e.to_string()))?;
        rules.sort_by_key(Rule::id);
        Ok(rules)
    }

    fn save_rules(&mut self, rules: &[Rule]) -> Result<()> {
        check_capacity(self.max_rules, rules.len())?;
        let text = serde_json::to_string_pretty(rules)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;

        info!(path = %self.path.display(), count = rules.len(), "Rules saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynrules_core::RuleId;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRuleStore::new(dir.path().join("rules.json"), 8);
        assert!(store.load_rules().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonRuleStore::new(dir.path().join("rules.json"), 8);
        store
            .save_rules(&[
                Rule::with_payload(3, "c()").weighted(1.5).unwrap(),
                Rule::with_payload(1, "a()").weighted(4.0).unwrap(),
            ])
            .unwrap();

        let rules = store.load_rules().unwrap();
        assert_eq!(rules[0].id(), RuleId(1));
        assert_eq!(rules[1].payload(), "c()");
        assert!(!rules[0].used());
        assert_eq!(store.load_rules_limited(1).unwrap().len(), 1);
        assert!(!dir.path().join("rules.json.tmp").exists());
    }

    #[test]
    fn garbage_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonRuleStore::new(&path, 8);
        assert!(matches!(store.load_rules(), Err(StoreError::Serialization(_))));
    }

    #[test]
    fn negative_weight_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"[{"id": 1, "weight": -2.0, "code": "x()"}]"#).unwrap();
        let store = JsonRuleStore::new(&path, 8);
        assert!(matches!(store.load_rules(), Err(StoreError::Serialization(_))));
    }
}
