//! Error types for the rule engine

use thiserror::Error;

/// Result type for rule operations
pub type Result<T> = std::result::Result<T, Error>;

/// Rule engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed base or polarity token
    #[error(transparent)]
    Validation(#[from] ledger_core::Error),

    /// Malformed pattern text
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Edge would break a rule table invariant
    #[error("Rule conflict: {0}")]
    Conflict(String),

    /// Numeric payload out of range or not representable
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Proportional split with zero total weight
    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
