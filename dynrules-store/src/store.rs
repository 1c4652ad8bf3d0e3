//! The [`RuleStore`] abstraction and helpers shared by every back-end.
//!
//! A store supplies the initial rules of a [`RuleSet`] and receives them
//! back after learning. It also knows how many rules it manages, which
//! doubles as the slot count when it writes an assembled script to disk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use dynrules_core::{
    AssemblyReport, RandomSource, Rule, RuleSet, ScriptAssembler, ScriptTemplate, WeightPolicy,
};
use tracing::{debug, info};

use crate::error::{Result, StoreError};

/// Infix between the prefix and suffix of a hint file name.
pub const RULE_FILE_INFIX: &str = "_rules_";
/// Extension of hint files.
pub const RULE_FILE_EXTENSION: &str = ".py";

/// Source and sink of rules.
pub trait RuleStore {
    /// Number of rules this store manages.
    fn max_rules(&self) -> usize;

    /// Load every rule in the store, ordered by id.
    ///
    /// # Errors
    /// Back-end specific read or decode failure.
    fn load_rules(&self) -> Result<Vec<Rule>>;

    /// Load at most `max_count` rules, ordered by id.
    ///
    /// # Errors
    /// Back-end specific read or decode failure.
    fn load_rules_limited(&self, max_count: usize) -> Result<Vec<Rule>> {
        let mut rules = self.load_rules()?;
        rules.truncate(max_count);
        Ok(rules)
    }

    /// Replace the stored rules with `rules`.
    ///
    /// # Errors
    /// `StoreError::CapacityExceeded` when `rules` is longer than
    /// [`RuleStore::max_rules`], otherwise a back-end write failure.
    fn save_rules(&mut self, rules: &[Rule]) -> Result<()>;

    /// Assemble a script with [`RuleStore::max_rules`] slots and write it
    /// to `path`, creating or truncating the file.
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the file cannot be created or written.
    fn save_script_to_file<P, R, T>(
        &self,
        path: &Path,
        assembler: &mut ScriptAssembler<'_, P, R, T>,
    ) -> Result<AssemblyReport>
    where
        P: WeightPolicy,
        R: RandomSource,
        T: ScriptTemplate,
    {
        let mut writer = BufWriter::new(File::create(path)?);
        let report = assembler.assemble_script(&mut writer, self.max_rules())?;
        writer.flush()?;

        info!(
            path = %path.display(),
            rules = report.rules_written,
            bytes = report.bytes_written,
            "Script written"
        );
        Ok(report)
    }

    /// Write a script to `<prefix>_rules_<suffix>.py` and return the path.
    ///
    /// # Errors
    /// Same as [`RuleStore::save_script_to_file`].
    fn save_rules_hint_file<P, R, T>(
        &self,
        prefix: &str,
        suffix: &str,
        assembler: &mut ScriptAssembler<'_, P, R, T>,
    ) -> Result<PathBuf>
    where
        P: WeightPolicy,
        R: RandomSource,
        T: ScriptTemplate,
    {
        let path = hint_file_path(prefix, suffix);
        self.save_script_to_file(&path, assembler)?;
        Ok(path)
    }
}

/// File name used by [`RuleStore::save_rules_hint_file`].
#[must_use]
pub fn hint_file_path(prefix: &str, suffix: &str) -> PathBuf {
    PathBuf::from(format!(
        "{prefix}{RULE_FILE_INFIX}{suffix}{RULE_FILE_EXTENSION}"
    ))
}

/// Add every rule from `store` to `ruleset`. Returns the number loaded.
///
/// Weights are clamped into the set's bounds; a stored rule with an id
/// already in the set replaces it.
///
/// # Errors
/// A load failure, or `StoreError::Core` if a stored weight is invalid.
pub fn populate<P, S>(ruleset: &mut RuleSet<P>, store: &S) -> Result<usize>
where
    P: WeightPolicy,
    S: RuleStore + ?Sized,
{
    let rules = store.load_rules()?;
    let count = rules.len();
    for rule in rules {
        ruleset.add_rule(rule)?;
    }
    debug!(count, total_weight = ruleset.total_weight(), "Rule set populated");
    Ok(count)
}

/// Save the current contents of `ruleset` into `store`.
///
/// # Errors
/// Whatever [`RuleStore::save_rules`] reports.
pub fn persist<P, S>(ruleset: &RuleSet<P>, store: &mut S) -> Result<()>
where
    P: WeightPolicy,
    S: RuleStore + ?Sized,
{
    let rules: Vec<Rule> = ruleset.rules().cloned().collect();
    store.save_rules(&rules)
}

/// Shared capacity check for [`RuleStore::save_rules`] implementations.
pub(crate) fn check_capacity(limit: usize, requested: usize) -> Result<()> {
    if requested > limit {
        return Err(StoreError::CapacityExceeded { limit, requested });
    }
    Ok(())
}
