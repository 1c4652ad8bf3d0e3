//! Error types for the dynrules core library.

use thiserror::Error;

use crate::rule::RuleId;

/// Top-level error type for all core operations.
#[derive(Error, Debug)]
pub enum DynrulesError {
    /// A caller-supplied value is outside its valid domain
    /// (inverted weight bounds, negative weight, non-finite weight).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No rule with the given id is a member of the set.
    #[error("Rule not found: {0}")]
    NotFound(RuleId),

    /// Assembler or configuration value out of range.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Writing an assembled script failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, DynrulesError>;
