//! Transfer Rules
//!
//! Rule engine that reclassifies, splits, merges and scales ledger values
//! according to wildcard-pattern rules.
//!
//! # Architecture
//!
//! 1. **Patterns**: `BasePattern` compiles `*` templates over the five base
//!    fields into literal/wildcard segments
//! 2. **Index**: `PatternIndex` buckets source patterns by literal name so a
//!    base is only tested against plausible candidates
//! 3. **Rules**: `TransferRules` stores `(from, to) → attribute` edges and
//!    keeps forward map, backward map and index in step
//! 4. **Engine**: `RuleEngine` shares a table between threads and records
//!    metrics
//!
//! # Transfer Semantics
//!
//! - `Aggregate`: value moves unchanged to the single target
//! - `HatAggregate`: same, with the polarity flipped
//! - `Ratio(w)`: value is split by `w / Σw` over the source's targets
//! - `Multiply(f)`: value is scaled by `f` for each target
//!
//! # Example
//!
//! ```
//! use ledger_core::{Base, BaseValues};
//! use rust_decimal::Decimal;
//! use transfer_rules::{Config, RuleEngine, TransferAttribute};
//!
//! # fn main() -> transfer_rules::Result<()> {
//! let engine = RuleEngine::new(Config::default())?;
//! engine.put("fish".parse()?, "tuna".parse()?, TransferAttribute::ratio(Decimal::ONE)?)?;
//!
//! let input: BaseValues = vec![(Base::new("fish")?, Decimal::from(100))].into_iter().collect();
//! let output = engine.transfer(&input)?;
//! assert_eq!(output.get(&Base::new("tuna")?), Some(Decimal::from(100)));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod pattern;
pub mod index;
pub mod attribute;
pub mod rules;
pub mod error;
pub mod config;
pub mod metrics;
pub mod engine;

// Re-exports
pub use error::{Error, Result};
pub use pattern::{BasePattern, FieldPattern, PolarityPattern, Segment};
pub use index::PatternIndex;
pub use attribute::{AttributeKind, TransferAttribute};
pub use rules::TransferRules;
pub use config::Config;
pub use engine::RuleEngine;
