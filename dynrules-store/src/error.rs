//! Error types for rule stores.

use thiserror::Error;

/// Error type for all store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A rule read from the store violates a core invariant, or the script
    /// writer failed.
    #[error(transparent)]
    Core(#[from] dynrules_core::DynrulesError),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store cannot hold this many rules.
    #[error("Rule capacity exceeded (limit: {limit}, requested: {requested})")]
    CapacityExceeded {
        /// Maximum the store manages.
        limit: usize,
        /// Number of rules offered.
        requested: usize,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, StoreError>;
