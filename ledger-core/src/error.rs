//! Error types for ledger keys and values

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger key errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed key field or polarity token
    #[error("Validation error: {0}")]
    Validation(String),

    /// Canonical string could not be split into key fields
    #[error("Parse error: {0}")]
    Parse(String),

    /// Decimal arithmetic exceeded the representable range
    #[error("Overflow: {0}")]
    Overflow(String),
}
