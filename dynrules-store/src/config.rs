//! Store configuration, usually the `[store]` table of `dynrules.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Settings shared by the rule stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of rules a store manages. Also the slot count used
    /// when a store writes a script.
    #[serde(default = "default_max_rules")]
    pub max_rules: usize,
    /// Store a CRC-32 of each payload and verify it on load.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
    /// Use WAL journaling for SQLite stores.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Backing file for file-based stores. `None` means in-memory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_rules: default_max_rules(),
            checksum_enabled: true,
            wal_mode: true,
            path: None,
        }
    }
}

impl StoreConfig {
    /// Reject a zero capacity.
    ///
    /// # Errors
    /// Returns `StoreError::CapacityExceeded` with `limit == 0`.
    pub fn validate(&self) -> Result<()> {
        if self.max_rules == 0 {
            return Err(StoreError::CapacityExceeded {
                limit: 0,
                requested: 1,
            });
        }
        Ok(())
    }
}

fn default_max_rules() -> usize {
    64
}
fn default_true() -> bool {
    true
}
