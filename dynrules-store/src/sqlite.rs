//! SQLite rule store.
//!
//! One row per rule:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS rules (
//!     id         INTEGER PRIMARY KEY,
//!     weight     REAL NOT NULL,
//!     code       TEXT NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```
//!
//! - WAL mode so a host can read rules while a learner writes them back.
//! - Optional CRC-32 of each payload to spot corrupted rows.
//! - `save_rules` replaces the whole table inside one transaction.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use dynrules_core::{Rule, RuleId};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::Result;
use crate::store::{check_capacity, RuleStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS rules (
    id         INTEGER PRIMARY KEY,
    weight     REAL NOT NULL,
    code       TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 (ISO 3309) of `data` as lowercase hex.
fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SqliteRuleStore
// ---------------------------------------------------------------------------

/// Raw row before validation.
type RuleRow = (i64, f64, String, Option<String>);

/// Rule store backed by an SQLite database.
///
/// ```no_run
/// # use dynrules_store::{RuleStore, SqliteRuleStore, StoreConfig};
/// # use dynrules_core::Rule;
/// let mut store = SqliteRuleStore::open("rules.db", &StoreConfig::default())?;
/// store.save_rules(&[Rule::with_payload(0, "attack()").weighted(10.0)?])?;
/// let rules = store.load_rules()?;
/// # Ok::<(), dynrules_store::StoreError>(())
/// ```
pub struct SqliteRuleStore {
    conn: Connection,
    config: StoreConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteRuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRuleStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SqliteRuleStore {
    /// Open (or create) the database at `path` and ensure the schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &StoreConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            max_rules = config.max_rules,
            "Rule database opened"
        );

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` on SQLite failures.
    pub fn open_in_memory(config: &StoreConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Open the database named by `config.path`, or an in-memory one when
    /// no path is set.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` on SQLite failures.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        match &config.path {
            Some(path) => Self::open(path, config),
            None => Self::open_in_memory(config),
        }
    }

    // ------------------------------------------------------------------
    // Single-rule access
    // ------------------------------------------------------------------

    /// Load one rule by id.
    ///
    /// # Errors
    ///
    /// `StoreError::Database` on SQLite failures, `StoreError::Core` if
    /// the stored weight is invalid.
    pub fn load_rule(&self, id: RuleId) -> Result<Option<Rule>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, weight, code, checksum FROM rules WHERE id = ?1")?;

        let row: Option<RuleRow> = stmt
            .query_row(params![id.0], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .optional()?;

        row.map(|row| self.rule_from_row(row)).transpose()
    }

    /// Insert or update a single rule, keeping the rest of the table.
    ///
    /// # Errors
    ///
    /// `StoreError::CapacityExceeded` when inserting a new id into a full
    /// store, `StoreError::Database` on SQLite failures.
    pub fn upsert_rule(&self, rule: &Rule) -> Result<()> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM rules WHERE id = ?1)",
            params![rule.id().0],
            |row| row.get(0),
        )?;
        if !exists {
            check_capacity(self.config.max_rules, self.rule_count()? + 1)?;
        }

        self.conn.execute(
            "INSERT INTO rules (id, weight, code, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                weight = excluded.weight,
                code = excluded.code,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![
                rule.id().0,
                rule.weight(),
                rule.payload(),
                Utc::now().to_rfc3339(),
                self.checksum(rule)
            ],
        )?;
        Ok(())
    }

    /// Delete a rule. Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` on SQLite failures.
    pub fn delete_rule(&self, id: RuleId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM rules WHERE id = ?1", params![id.0])?;
        Ok(deleted > 0)
    }

    /// Number of stored rules.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` on SQLite failures.
    pub fn rule_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM rules", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;

        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Rule database backup completed"
        );
        Ok(())
    }

    /// `Ok(true)` if `PRAGMA integrity_check` reports no problems.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    /// Database file, or `:memory:`.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    fn checksum(&self, rule: &Rule) -> Option<String> {
        self.config
            .checksum_enabled
            .then(|| crc32_hex(rule.payload().as_bytes()))
    }

    fn rule_from_row(&self, (id, weight, code, stored): RuleRow) -> Result<Rule> {
        if self.config.checksum_enabled {
            if let Some(expected) = stored {
                let actual = crc32_hex(code.as_bytes());
                if expected != actual {
                    warn!(
                        rule = id,
                        expected = %expected,
                        actual = %actual,
                        "Checksum mismatch, rule payload may be corrupted"
                    );
                }
            }
        }
        Ok(Rule::with_payload(id, code).weighted(weight)?)
    }

    fn query_rules(&self, limit: i64) -> Result<Vec<Rule>> {
        let start = Instant::now();
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, weight, code, checksum FROM rules ORDER BY id LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<std::result::Result<Vec<RuleRow>, _>>()?;

        let rules = rows
            .into_iter()
            .map(|row| self.rule_from_row(row))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            count = rules.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded rules"
        );
        Ok(rules)
    }
}

impl RuleStore for SqliteRuleStore {
    fn max_rules(&self) -> usize {
        self.config.max_rules
    }

    fn load_rules(&self) -> Result<Vec<Rule>> {
        // SQLite treats a negative LIMIT as unbounded.
        self.query_rules(-1)
    }

    fn load_rules_limited(&self, max_count: usize) -> Result<Vec<Rule>> {
        self.query_rules(i64::try_from(max_count).unwrap_or(i64::MAX))
    }

    fn save_rules(&mut self, rules: &[Rule]) -> Result<()> {
        check_capacity(self.config.max_rules, rules.len())?;
        let start = Instant::now();
        let now = Utc::now().to_rfc3339();
        let checksums: Vec<Option<String>> = rules.iter().map(|r| self.checksum(r)).collect();

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM rules", [])?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO rules (id, weight, code, updated_at, checksum)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    weight = excluded.weight,
                    code = excluded.code,
                    updated_at = excluded.updated_at,
                    checksum = excluded.checksum",
            )?;
            for (rule, checksum) in rules.iter().zip(&checksums) {
                insert.execute(params![
                    rule.id().0,
                    rule.weight(),
                    rule.payload(),
                    now,
                    checksum
                ])?;
            }
        }
        tx.commit()?;

        debug!(
            count = rules.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved rules"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
