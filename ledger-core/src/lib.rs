//! Ledger Core
//!
//! Key and value types for economic ledger entries.
//!
//! # Architecture
//!
//! - **Base**: immutable five-part key (name, polarity, unit, time, subject)
//! - **BaseValues**: ordered map from base to exact decimal value
//!
//! # Invariants
//!
//! - Every constructed `Base` passed validation (no whitespace, no reserved
//!   characters, non-empty name)
//! - `BaseValues` never holds two entries for the same base

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod values;
pub mod error;

// Re-exports
pub use error::{Error, Result};
pub use types::{Base, IgnoreCase, Polarity, OMITTED_KEY};
pub use values::BaseValues;
