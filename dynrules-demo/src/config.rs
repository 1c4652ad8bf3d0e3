//! Demo configuration.
//!
//! One TOML file drives the whole run:
//!
//! ```toml
//! [general]
//! log_level = "debug"
//!
//! [ruleset]
//! min_weight = 0.0
//! max_weight = 30.0
//!
//! [assembler]
//! max_script_size = 512
//!
//! [store]
//! max_rules = 6
//!
//! [arena]
//! episodes = 500
//! rules_per_script = 4
//! seed = 42
//! ```

use dynrules_core::DynrulesConfig;
use dynrules_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::policy::WarriorPolicy;

/// Everything the arena binary reads from its config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemoConfig {
    /// `[general]`, `[ruleset]` and `[assembler]`.
    #[serde(flatten)]
    pub core: DynrulesConfig,
    /// Rule pool and output script size.
    #[serde(default)]
    pub store: StoreConfig,
    /// Bout settings.
    #[serde(default)]
    pub arena: ArenaConfig,
    /// Reward shaping.
    #[serde(default)]
    pub policy: WarriorPolicy,
}

impl DemoConfig {
    /// Parse from TOML text.
    ///
    /// # Errors
    /// Returns an error if the TOML is malformed or has wrong types.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Validate every section.
    ///
    /// # Errors
    /// The first out-of-range value.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.core.validate()?;
        self.store.validate()?;
        if self.arena.rules_per_script == 0 {
            anyhow::bail!("arena.rules_per_script must be > 0");
        }
        Ok(())
    }
}

/// `[arena]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Number of learning bouts.
    #[serde(default = "default_episodes")]
    pub episodes: usize,
    /// Script slots per bout.
    #[serde(default = "default_rules_per_script")]
    pub rules_per_script: usize,
    /// Seed for tactic effectiveness, bout rolls and script sampling.
    /// Entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Log a progress line every this many bouts.
    #[serde(default = "default_report_every")]
    pub report_every: usize,
    /// Prefix of the final script file, `<prefix>_rules_<episodes>.py`.
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            episodes: default_episodes(),
            rules_per_script: default_rules_per_script(),
            seed: None,
            report_every: default_report_every(),
            output_prefix: default_output_prefix(),
        }
    }
}

fn default_episodes() -> usize {
    300
}
fn default_rules_per_script() -> usize {
    4
}
fn default_report_every() -> usize {
    50
}
fn default_output_prefix() -> String {
    "warrior".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = DemoConfig::from_toml("").unwrap();
        assert_eq!(config.arena.episodes, 300);
        assert_eq!(config.store.max_rules, 64);
        assert_eq!(config.core.assembler.max_tries, 100);
        config.validate().unwrap();
    }

    #[test]
    fn sections_are_read() {
        let config = DemoConfig::from_toml(
            r#"
            [general]
            json_logs = true

            [ruleset]
            max_weight = 30.0

            [store]
            max_rules = 6

            [arena]
            episodes = 20
            seed = 9
            output_prefix = "knight"

            [policy]
            death_penalty = 5.0
            "#,
        )
        .unwrap();
        assert!(config.core.general.json_logs);
        assert!((config.core.ruleset.max_weight - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.store.max_rules, 6);
        assert_eq!(config.arena.seed, Some(9));
        assert_eq!(config.arena.output_prefix, "knight");
        assert!((config.policy.death_penalty - 5.0).abs() < f64::EPSILON);
        assert!((config.policy.break_even - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_slots_rejected() {
        let config = DemoConfig::from_toml("[arena]\nrules_per_script = 0").unwrap();
        assert!(config.validate().is_err());
    }
}
