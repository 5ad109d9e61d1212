//! Keyed value collection
//!
//! [`BaseValues`] maps each [`Base`] to exactly one decimal value. It is the
//! input and output of whole-collection rule transfers.

use crate::types::Base;
use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// Ordered, duplicate-free collection of base values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseValues {
    entries: BTreeMap<Base, Decimal>,
}

impl BaseValues {
    /// Create empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Value booked under `base`
    pub fn get(&self, base: &Base) -> Option<Decimal> {
        self.entries.get(base).copied()
    }

    /// Whether `base` has an entry
    pub fn contains(&self, base: &Base) -> bool {
        self.entries.contains_key(base)
    }

    /// Set the value of `base`, returning the previous one
    pub fn insert(&mut self, base: Base, value: Decimal) -> Option<Decimal> {
        self.entries.insert(base, value)
    }

    /// Add `value` to the entry of `base`, creating it if absent.
    ///
    /// Panics if the sum overflows; use [`try_add`](Self::try_add) for
    /// untrusted amounts.
    pub fn add(&mut self, base: Base, value: Decimal) {
        *self.entries.entry(base).or_insert(Decimal::ZERO) += value;
    }

    /// Add `value` to the entry of `base`, failing with
    /// [`Error::Overflow`] instead of panicking. The entry is unchanged on
    /// failure.
    pub fn try_add(&mut self, base: Base, value: Decimal) -> Result<()> {
        let current = self.get(&base).unwrap_or(Decimal::ZERO);
        let sum = current.checked_add(value).ok_or_else(|| {
            Error::Overflow(format!("{} + {} under {}", current, value, base))
        })?;
        self.entries.insert(base, sum);
        Ok(())
    }

    /// Add every entry of `other` into this collection
    pub fn merge(&mut self, other: &BaseValues) {
        for (base, value) in other.iter() {
            self.add(base.clone(), value);
        }
    }

    /// Checked [`merge`](Self::merge). Entries added before an overflow
    /// stay added.
    pub fn try_merge(&mut self, other: &BaseValues) -> Result<()> {
        for (base, value) in other.iter() {
            self.try_add(base.clone(), value)?;
        }
        Ok(())
    }

    /// Remove the entry of `base`
    pub fn remove(&mut self, base: &Base) -> Option<Decimal> {
        self.entries.remove(base)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in base order
    pub fn iter(&self) -> impl Iterator<Item = (&Base, Decimal)> + '_ {
        self.entries.iter().map(|(base, value)| (base, *value))
    }

    /// Iterate bases in order
    pub fn bases(&self) -> impl Iterator<Item = &Base> + '_ {
        self.entries.keys()
    }

    /// Sum of all values. Panics on overflow, see [`try_total`](Self::try_total).
    pub fn total(&self) -> Decimal {
        self.entries.values().copied().sum()
    }

    /// Sum of all values, `None` on overflow
    pub fn try_total(&self) -> Option<Decimal> {
        self.entries
            .values()
            .try_fold(Decimal::ZERO, |sum, value| sum.checked_add(*value))
    }

    /// Entries whose base satisfies `predicate`
    pub fn projection<F>(&self, mut predicate: F) -> BaseValues
    where
        F: FnMut(&Base) -> bool,
    {
        self.entries
            .iter()
            .filter(|(base, _)| predicate(base))
            .map(|(base, value)| (base.clone(), *value))
            .collect()
    }

    /// Entrywise sum
    pub fn plus(&self, other: &BaseValues) -> BaseValues {
        let mut result = self.clone();
        result.merge(other);
        result
    }

    /// Entrywise difference
    pub fn minus(&self, other: &BaseValues) -> BaseValues {
        let mut result = self.clone();
        for (base, value) in other.iter() {
            result.add(base.clone(), -value);
        }
        result
    }
}

impl FromIterator<(Base, Decimal)> for BaseValues {
    /// Collect entries; repeated bases are summed
    fn from_iter<I: IntoIterator<Item = (Base, Decimal)>>(iter: I) -> Self {
        let mut values = BaseValues::new();
        values.extend(iter);
        values
    }
}

impl Extend<(Base, Decimal)> for BaseValues {
    fn extend<I: IntoIterator<Item = (Base, Decimal)>>(&mut self, iter: I) {
        for (base, value) in iter {
            self.add(base, value);
        }
    }
}

impl IntoIterator for BaseValues {
    type Item = (Base, Decimal);
    type IntoIter = btree_map::IntoIter<Base, Decimal>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
