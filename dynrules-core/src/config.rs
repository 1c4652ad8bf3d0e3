//! Configuration for rule sets and script assembly.
//!
//! Maps to a `dynrules.toml` file:
//!
//! ```toml
//! [general]
//! log_level = "debug"
//!
//! [ruleset]
//! min_weight = 0.0
//! max_weight = 20.0
//!
//! [assembler]
//! max_tries = 100
//! max_script_size = 1024
//! seed = 42
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{DynrulesError, Result};
use crate::policy::WeightPolicy;
use crate::ruleset::RuleSet;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DynrulesConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Weight bounds for new rule sets.
    #[serde(default)]
    pub ruleset: RuleSetConfig,
    /// Script assembly limits.
    #[serde(default)]
    pub assembler: AssemblerConfig,
}

impl DynrulesConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `DynrulesError::Configuration` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| DynrulesError::Configuration(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check every section for out-of-range values.
    ///
    /// # Errors
    /// The first violation found.
    pub fn validate(&self) -> Result<()> {
        self.ruleset.validate()?;
        self.assembler.validate()
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Weight bounds applied to rule sets built from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSetConfig {
    /// Lowest weight a rule may hold.
    #[serde(default)]
    pub min_weight: f64,
    /// Highest weight a rule may hold.
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,
}

impl Default for RuleSetConfig {
    fn default() -> Self {
        Self {
            min_weight: 0.0,
            max_weight: default_max_weight(),
        }
    }
}

impl RuleSetConfig {
    /// Check the bounds.
    ///
    /// # Errors
    /// Returns `DynrulesError::InvalidArgument` for negative, non-finite or
    /// inverted bounds.
    pub fn validate(&self) -> Result<()> {
        RuleSet::new(self.min_weight, self.max_weight).map(|_| ())
    }

    /// Build an empty rule set with these bounds.
    ///
    /// # Errors
    /// Same as [`RuleSetConfig::validate`].
    pub fn build<P: WeightPolicy>(&self, policy: P) -> Result<RuleSet<P>> {
        RuleSet::with_policy(self.min_weight, self.max_weight, policy)
    }
}

/// Limits for [`ScriptAssembler`](crate::ScriptAssembler).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Draws allowed per script slot before the slot is given up.
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
    /// Byte budget for the rules section, excluding header and footer.
    #[serde(default = "default_max_script_size")]
    pub max_script_size: usize,
    /// Fixed RNG seed; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_tries: default_max_tries(),
            max_script_size: default_max_script_size(),
            seed: None,
        }
    }
}

impl AssemblerConfig {
    /// Check the limits.
    ///
    /// # Errors
    /// Returns `DynrulesError::Configuration` if either limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_tries == 0 {
            return Err(DynrulesError::Configuration("max_tries must be > 0".into()));
        }
        if self.max_script_size == 0 {
            return Err(DynrulesError::Configuration(
                "max_script_size must be > 0".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde requires functions, not constants)
// ---------------------------------------------------------------------------

fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_weight() -> f64 {
    100.0
}
fn default_max_tries() -> u32 {
    100
}
fn default_max_script_size() -> usize {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DynrulesConfig::default();
        config.validate().unwrap();
        assert_eq!(config.assembler.max_tries, 100);
        assert_eq!(config.assembler.max_script_size, 1024);
        assert!(config.assembler.seed.is_none());
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = DynrulesConfig::from_toml("").unwrap();
        assert!((config.ruleset.max_weight - 100.0).abs() < f64::EPSILON);
        assert_eq!(config.assembler.max_script_size, 1024);
    }

    #[test]
    fn partial_toml_overrides() {
        let config = DynrulesConfig::from_toml(
            r#"
            [ruleset]
            min_weight = 1.0
            max_weight = 20.0

            [assembler]
            max_script_size = 120
            seed = 7
            "#,
        )
        .unwrap();
        assert!((config.ruleset.min_weight - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.assembler.max_script_size, 120);
        assert_eq!(config.assembler.max_tries, 100);
        assert_eq!(config.assembler.seed, Some(7));
        config.validate().unwrap();
    }

    #[test]
    fn invalid_values_rejected() {
        let config = DynrulesConfig::from_toml("[assembler]\nmax_tries = 0").unwrap();
        assert!(matches!(
            config.validate(),
            Err(DynrulesError::Configuration(_))
        ));

        let config = DynrulesConfig::from_toml("[ruleset]\nmin_weight = 5.0\nmax_weight = 1.0").unwrap();
        assert!(matches!(
            config.validate(),
            Err(DynrulesError::InvalidArgument(_))
        ));

        assert!(DynrulesConfig::from_toml("[assembler\n").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dynrules.toml");
        std::fs::write(&path, "[general]\nlog_level = \"debug\"\njson_logs = true\n").unwrap();
        let config = DynrulesConfig::from_file(&path).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert!(config.general.json_logs);
    }
}
