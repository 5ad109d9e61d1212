//! Source pattern index
//!
//! Narrows the registered source patterns that could match a base without
//! scanning the whole rule table.
//!
//! # Layout
//!
//! - **Literal buckets**: patterns whose name field has no wildcard, keyed
//!   by that name
//! - **Fallback**: patterns with a wildcard in the name, always scanned
//!
//! Candidates still have to be filtered with [`BasePattern::matches`];
//! the index only guarantees that no matching pattern is left out.

use crate::pattern::BasePattern;
use ledger_core::Base;
use std::collections::{BTreeSet, HashMap};

/// Index over registered source patterns
#[derive(Debug, Clone, Default)]
pub struct PatternIndex {
    /// Literal-name patterns, keyed by name
    by_name: HashMap<String, BTreeSet<BasePattern>>,

    /// Patterns with a wildcard name
    fallback: BTreeSet<BasePattern>,
}

impl PatternIndex {
    /// Create empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern. Returns false if it was already present.
    pub fn insert(&mut self, pattern: BasePattern) -> bool {
        match pattern.name().literal() {
            Some(name) => self
                .by_name
                .entry(name.to_string())
                .or_default()
                .insert(pattern),
            None => self.fallback.insert(pattern),
        }
    }

    /// Unregister a pattern. Returns false if it was not present.
    pub fn remove(&mut self, pattern: &BasePattern) -> bool {
        match pattern.name().literal() {
            Some(name) => {
                let Some(bucket) = self.by_name.get_mut(name) else {
                    return false;
                };
                let removed = bucket.remove(pattern);
                if bucket.is_empty() {
                    self.by_name.remove(name);
                }
                removed
            }
            None => self.fallback.remove(pattern),
        }
    }

    /// Whether the pattern is registered
    pub fn contains(&self, pattern: &BasePattern) -> bool {
        match pattern.name().literal() {
            Some(name) => self
                .by_name
                .get(name)
                .is_some_and(|bucket| bucket.contains(pattern)),
            None => self.fallback.contains(pattern),
        }
    }

    /// Drop every pattern
    pub fn clear(&mut self) {
        self.by_name.clear();
        self.fallback.clear();
    }

    /// Number of registered patterns
    pub fn len(&self) -> usize {
        self.by_name.values().map(BTreeSet::len).sum::<usize>() + self.fallback.len()
    }

    /// Whether no pattern is registered
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty() && self.fallback.is_empty()
    }

    /// Patterns that might match `base`: the bucket for its name plus
    /// the fallback bucket.
    pub fn candidates<'a>(&'a self, base: &Base) -> impl Iterator<Item = &'a BasePattern> + 'a {
        self.by_name
            .get(base.name())
            .into_iter()
            .flatten()
            .chain(self.fallback.iter())
    }

    /// Registered patterns matching `base`, in pattern order
    pub fn matches(&self, base: &Base) -> BTreeSet<&BasePattern> {
        self.candidates(base)
            .filter(|pattern| pattern.matches(base))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(text: &str) -> BasePattern {
        text.parse().unwrap()
    }

    fn base(text: &str) -> Base {
        text.parse().unwrap()
    }

    #[test]
    fn test_buckets_by_literal_name() {
        let mut index = PatternIndex::new();
        assert!(index.insert(pattern("meat")));
        assert!(index.insert(pattern("meat-HAT")));
        assert!(index.insert(pattern("fish")));
        assert!(index.insert(pattern("*All")));
        assert!(!index.insert(pattern("meat")));
        assert_eq!(index.len(), 4);

        let candidates: Vec<_> = index.candidates(&base("meat")).collect();
        assert_eq!(candidates.len(), 3);
        assert!(!candidates.contains(&&pattern("fish")));
    }

    #[test]
    fn test_matches_filters_candidates() {
        let mut index = PatternIndex::new();
        index.insert(pattern("meat-HAT"));
        index.insert(pattern("meat*"));
        index.insert(pattern("fish"));

        let found = index.matches(&base("meatAll"));
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![&pattern("meat*")]);
        assert!(index.matches(&base("veg")).is_empty());
    }

    #[test]
    fn test_remove_drops_empty_buckets() {
        let mut index = PatternIndex::new();
        index.insert(pattern("meat"));
        index.insert(pattern("*"));

        assert!(index.remove(&pattern("meat")));
        assert!(!index.remove(&pattern("meat")));
        assert!(!index.contains(&pattern("meat")));
        assert!(index.contains(&pattern("*")));
        assert_eq!(index.len(), 1);

        index.clear();
        assert!(index.is_empty());
    }
}
