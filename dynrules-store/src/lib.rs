//! # dynrules-store
//!
//! Loading and saving rule collections, and writing assembled scripts to
//! disk. The core crate never performs I/O on its own; everything that
//! touches a file or a database lives here.
//!
//! - `store` — the [`RuleStore`] trait and helpers shared by all back-ends
//! - `memory` — [`InMemoryRuleStore`], a pre-allocated store for tests and prototyping
//! - `json` — [`JsonRuleStore`], a single JSON file
//! - `sqlite` — [`SqliteRuleStore`], an SQLite table with payload checksums

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod json;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use json::JsonRuleStore;
pub use memory::InMemoryRuleStore;
pub use sqlite::SqliteRuleStore;
pub use store::{hint_file_path, persist, populate, RuleStore};
