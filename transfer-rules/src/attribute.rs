//! Transfer attributes
//!
//! Every rule edge carries exactly one [`TransferAttribute`]. The attribute
//! kind decides how a matched value moves to the target:
//!
//! | Kind           | Fan-out | Value at target          | Polarity  |
//! |----------------|---------|--------------------------|-----------|
//! | `Aggregate`    | 1       | unchanged                | preserved |
//! | `HatAggregate` | 1       | unchanged                | flipped   |
//! | `Ratio(w)`     | n       | `value * w / Σw`         | preserved |
//! | `Multiply(f)`  | n       | `value * f`              | preserved |

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Attribute kind without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Merge into one target
    Aggregate,
    /// Merge into one target with flipped polarity
    HatAggregate,
    /// Proportional split
    Ratio,
    /// Multiplicative split
    Multiply,
}

impl AttributeKind {
    /// Whether the kind allows only one outgoing edge per source
    pub fn is_aggregate(&self) -> bool {
        matches!(self, AttributeKind::Aggregate | AttributeKind::HatAggregate)
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeKind::Aggregate => "aggregate",
            AttributeKind::HatAggregate => "hat-aggregate",
            AttributeKind::Ratio => "ratio",
            AttributeKind::Multiply => "multiply",
        };
        f.write_str(name)
    }
}

/// Attribute of a rule edge
///
/// Numeric payloads compare after normalization, so `Multiply(5)`,
/// `Multiply(5.0)` and `Multiply(5.00)` are the same attribute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TransferAttribute {
    /// Merge into one target
    Aggregate,
    /// Merge into one target with flipped polarity
    HatAggregate,
    /// Proportional split weight in `[0, 1]`
    Ratio(Decimal),
    /// Multiplicative factor
    Multiply(Decimal),
}

impl TransferAttribute {
    /// Validated ratio attribute
    pub fn ratio(weight: Decimal) -> Result<Self> {
        let attr = TransferAttribute::Ratio(weight);
        attr.validate()?;
        Ok(attr)
    }

    /// Multiply attribute
    pub fn multiply(factor: Decimal) -> Self {
        TransferAttribute::Multiply(factor)
    }

    /// Kind of this attribute
    pub fn kind(&self) -> AttributeKind {
        match self {
            TransferAttribute::Aggregate => AttributeKind::Aggregate,
            TransferAttribute::HatAggregate => AttributeKind::HatAggregate,
            TransferAttribute::Ratio(_) => AttributeKind::Ratio,
            TransferAttribute::Multiply(_) => AttributeKind::Multiply,
        }
    }

    /// Numeric payload (normalized)
    pub fn value(&self) -> Option<Decimal> {
        match self {
            TransferAttribute::Aggregate | TransferAttribute::HatAggregate => None,
            TransferAttribute::Ratio(v) | TransferAttribute::Multiply(v) => Some(v.normalize()),
        }
    }

    /// Check payload constraints
    pub fn validate(&self) -> Result<()> {
        match self {
            TransferAttribute::Ratio(w) if *w < Decimal::ZERO || *w > Decimal::ONE => {
                Err(Error::InvalidValue(format!(
                    "ratio weight {} is outside [0, 1]",
                    w
                )))
            }
            _ => Ok(()),
        }
    }
}

impl PartialEq for TransferAttribute {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.value() == other.value()
    }
}

impl Eq for TransferAttribute {}

impl Hash for TransferAttribute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        if let Some(value) = self.value() {
            value.hash(state);
        }
    }
}

impl fmt::Display for TransferAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => write!(f, "{}({})", self.kind(), value),
            None => write!(f, "{}", self.kind()),
        }
    }
}
