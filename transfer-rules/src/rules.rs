//! Rule table and transfer computation
//!
//! A [`TransferRules`] table holds directed edges
//! `(from pattern, to pattern) → attribute` and moves values booked under
//! a matching base onto the targets.
//!
//! # Invariants
//!
//! Hold after every successful mutation:
//!
//! 1. All edges leaving one source pattern share an attribute kind
//! 2. All edges entering one target pattern share an attribute kind
//! 3. An `Aggregate`/`HatAggregate` source has exactly one edge
//! 4. `Ratio`/`Multiply` sources may fan out
//! 5. A `(from, to)` pair appears at most once
//!
//! The forward map, the backward map and the optional [`PatternIndex`]
//! always describe the same edge set. Only the mutation methods of this
//! type touch them, and each updates all three.
//!
//! # Example
//!
//! ```
//! use ledger_core::{Base, BaseValues};
//! use rust_decimal::Decimal;
//! use transfer_rules::{TransferAttribute, TransferRules};
//!
//! # fn main() -> transfer_rules::Result<()> {
//! let mut rules = TransferRules::new(true);
//! rules.put("meat*".parse()?, "beef".parse()?, TransferAttribute::multiply(Decimal::TWO))?;
//!
//! let input: BaseValues = vec![(Base::new("meatAll")?, Decimal::from(20))].into_iter().collect();
//! let output = rules.transfer(&input)?;
//! assert_eq!(output.get(&Base::new("beef")?), Some(Decimal::from(40)));
//! # Ok(())
//! # }
//! ```

use crate::{
    attribute::{AttributeKind, TransferAttribute},
    config::Config,
    index::PatternIndex,
    pattern::BasePattern,
    Error, Result,
};
use ledger_core::{Base, BaseValues};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// Outgoing edges of one source pattern
pub type Edges = BTreeMap<BasePattern, TransferAttribute>;

/// Rule table
///
/// Mutation takes `&mut self`; share a table between threads through
/// [`crate::RuleEngine`], which serializes writers.
#[derive(Debug, Clone)]
pub struct TransferRules {
    /// Source pattern → target pattern → attribute
    forward: BTreeMap<BasePattern, Edges>,

    /// Target pattern → source patterns
    backward: BTreeMap<BasePattern, BTreeSet<BasePattern>>,

    /// Source pattern index (None = linear scan)
    index: Option<PatternIndex>,
}

impl Default for TransferRules {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PartialEq for TransferRules {
    /// Tables are equal when they hold the same edges, indexed or not
    fn eq(&self, other: &Self) -> bool {
        self.forward == other.forward
    }
}

impl Eq for TransferRules {}

fn conflict(msg: String) -> Error {
    tracing::debug!("Rejected rule edge: {}", msg);
    Error::Conflict(msg)
}

fn overflow(op: &str, value: Decimal, by: Decimal) -> Error {
    Error::InvalidValue(format!("{} {} by {} overflows", op, value, by))
}

fn sum_overflow(err: ledger_core::Error) -> Error {
    Error::InvalidValue(format!("summing transferred values: {}", err))
}

impl TransferRules {
    /// Create empty table, with or without the source pattern index
    pub fn new(indexed: bool) -> Self {
        Self {
            forward: BTreeMap::new(),
            backward: BTreeMap::new(),
            index: indexed.then(PatternIndex::new),
        }
    }

    /// Create empty table as configured
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.index.enabled)
    }

    /// Whether lookups go through the pattern index
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.forward.values().map(BTreeMap::len).sum()
    }

    /// Whether the table has no edges
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    /// Insert a new edge.
    ///
    /// Fails with [`Error::Conflict`] if the pair already exists, if the
    /// attribute kind differs from edges sharing `from` or `to`, or if an
    /// aggregate source would get a second edge. Fails with
    /// [`Error::InvalidValue`] for an out-of-range ratio.
    pub fn put(
        &mut self,
        from: BasePattern,
        to: BasePattern,
        attr: TransferAttribute,
    ) -> Result<()> {
        attr.validate()?;
        let kind = attr.kind();

        if self.contains(&from, &to) {
            return Err(conflict(format!("edge {} -> {} already exists", from, to)));
        }

        if let Some(existing) = self.from_kind(&from) {
            if existing != kind {
                return Err(conflict(format!(
                    "source {} already transfers by {}, not {}",
                    from, existing, kind
                )));
            }
            if kind.is_aggregate() {
                return Err(conflict(format!(
                    "{} source {} already has a target",
                    kind, from
                )));
            }
        }

        if let Some(existing) = self.to_kind(&to) {
            if existing != kind {
                return Err(conflict(format!(
                    "target {} is already reached by {}, not {}",
                    to, existing, kind
                )));
            }
        }

        tracing::debug!("Put rule edge {} -> {} ({})", from, to, attr);
        self.insert_edge(from, to, attr);
        Ok(())
    }

    /// Assign an edge, replacing what can be replaced.
    ///
    /// An existing `(from, to)` edge gets the new attribute. For aggregate
    /// kinds every other edge leaving `from` is dropped first. Kind
    /// conflicts with other edges leaving `from` (non-aggregate kinds) or
    /// with edges from other sources entering `to` are still rejected, and
    /// nothing is changed in that case.
    ///
    /// Returns the previous attribute of the `(from, to)` edge.
    pub fn set(
        &mut self,
        from: BasePattern,
        to: BasePattern,
        attr: TransferAttribute,
    ) -> Result<Option<TransferAttribute>> {
        attr.validate()?;
        let kind = attr.kind();

        if !kind.is_aggregate() {
            let clash = self
                .forward
                .get(&from)
                .into_iter()
                .flatten()
                .find(|(target, other)| **target != to && other.kind() != kind);
            if let Some((target, other)) = clash {
                return Err(conflict(format!(
                    "source {} already transfers to {} by {}, not {}",
                    from,
                    target,
                    other.kind(),
                    kind
                )));
            }
        }

        let clash = self
            .backward
            .get(&to)
            .into_iter()
            .flatten()
            .filter(|source| **source != from)
            .filter_map(|source| Some((source, self.get(source, &to)?.kind())))
            .find(|(_, other)| *other != kind);
        if let Some((source, other)) = clash {
            return Err(conflict(format!(
                "target {} is already reached from {} by {}, not {}",
                to, source, other, kind
            )));
        }

        if kind.is_aggregate() {
            let replaced: Vec<BasePattern> = self
                .forward
                .get(&from)
                .into_iter()
                .flat_map(|edges| edges.keys())
                .filter(|target| **target != to)
                .cloned()
                .collect();
            for target in replaced {
                tracing::debug!("Replacing rule edge {} -> {}", from, target);
                self.remove_edge(&from, &target);
            }
        }

        tracing::debug!("Set rule edge {} -> {} ({})", from, to, attr);
        Ok(self.insert_edge(from, to, attr))
    }

    /// Insert every edge of `other` with [`put`](Self::put) semantics.
    /// Either all edges are inserted or none.
    pub fn put_all(&mut self, other: &TransferRules) -> Result<()> {
        let mut staged = self.clone();
        for (from, to, attr) in other.iter() {
            staged.put(from.clone(), to.clone(), *attr)?;
        }
        *self = staged;
        Ok(())
    }

    /// Assign every edge of `other` with [`set`](Self::set) semantics.
    /// Either all edges are assigned or none.
    pub fn set_all(&mut self, other: &TransferRules) -> Result<()> {
        let mut staged = self.clone();
        for (from, to, attr) in other.iter() {
            staged.set(from.clone(), to.clone(), *attr)?;
        }
        *self = staged;
        Ok(())
    }

    /// Remove one edge
    pub fn remove(&mut self, from: &BasePattern, to: &BasePattern) -> bool {
        self.remove_edge(from, to).is_some()
    }

    /// Remove every edge leaving `from`
    pub fn remove_from(&mut self, from: &BasePattern) -> bool {
        let Some(edges) = self.forward.remove(from) else {
            return false;
        };
        if let Some(index) = self.index.as_mut() {
            index.remove(from);
        }
        for to in edges.keys() {
            self.unlink_backward(from, to);
        }
        true
    }

    /// Remove every edge entering `to`
    pub fn remove_to(&mut self, to: &BasePattern) -> bool {
        let Some(sources) = self.backward.remove(to) else {
            return false;
        };
        for from in &sources {
            self.unlink_forward(from, to);
        }
        true
    }

    /// Remove every edge
    pub fn clear(&mut self) {
        self.forward.clear();
        self.backward.clear();
        if let Some(index) = self.index.as_mut() {
            index.clear();
        }
    }

    fn insert_edge(
        &mut self,
        from: BasePattern,
        to: BasePattern,
        attr: TransferAttribute,
    ) -> Option<TransferAttribute> {
        if let Some(index) = self.index.as_mut() {
            index.insert(from.clone());
        }
        self.backward
            .entry(to.clone())
            .or_default()
            .insert(from.clone());
        self.forward.entry(from).or_default().insert(to, attr)
    }

    fn remove_edge(&mut self, from: &BasePattern, to: &BasePattern) -> Option<TransferAttribute> {
        let removed = self.unlink_forward(from, to)?;
        self.unlink_backward(from, to);
        Some(removed)
    }

    /// Drop `to` from the forward edges of `from` (and the index entry if
    /// that was the last edge)
    fn unlink_forward(&mut self, from: &BasePattern, to: &BasePattern) -> Option<TransferAttribute> {
        let edges = self.forward.get_mut(from)?;
        let removed = edges.remove(to)?;
        if edges.is_empty() {
            self.forward.remove(from);
            if let Some(index) = self.index.as_mut() {
                index.remove(from);
            }
        }
        Some(removed)
    }

    fn unlink_backward(&mut self, from: &BasePattern, to: &BasePattern) {
        if let Some(sources) = self.backward.get_mut(to) {
            sources.remove(from);
            if sources.is_empty() {
                self.backward.remove(to);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Query
    // ---------------------------------------------------------------------

    /// Whether the edge exists
    pub fn contains(&self, from: &BasePattern, to: &BasePattern) -> bool {
        self.get(from, to).is_some()
    }

    /// Whether any edge leaves `from`
    pub fn contains_from(&self, from: &BasePattern) -> bool {
        self.forward.contains_key(from)
    }

    /// Whether any edge enters `to`
    pub fn contains_to(&self, to: &BasePattern) -> bool {
        self.backward.contains_key(to)
    }

    /// Attribute of an edge
    pub fn get(&self, from: &BasePattern, to: &BasePattern) -> Option<&TransferAttribute> {
        self.forward.get(from)?.get(to)
    }

    /// Attribute kind shared by the edges leaving `from`
    pub fn from_kind(&self, from: &BasePattern) -> Option<AttributeKind> {
        self.forward
            .get(from)?
            .values()
            .next()
            .map(TransferAttribute::kind)
    }

    /// Attribute kind shared by the edges entering `to`
    pub fn to_kind(&self, to: &BasePattern) -> Option<AttributeKind> {
        let source = self.backward.get(to)?.iter().next()?;
        self.get(source, to).map(TransferAttribute::kind)
    }

    /// Targets of `from`
    pub fn lookup(&self, from: &BasePattern) -> BTreeSet<&BasePattern> {
        self.forward
            .get(from)
            .map(|edges| edges.keys().collect())
            .unwrap_or_default()
    }

    /// Sources reaching `to`
    pub fn inverse_lookup(&self, to: &BasePattern) -> BTreeSet<&BasePattern> {
        self.backward
            .get(to)
            .map(|sources| sources.iter().collect())
            .unwrap_or_default()
    }

    /// Outgoing edges of `from`
    pub fn edges_from(&self, from: &BasePattern) -> Option<&Edges> {
        self.forward.get(from)
    }

    /// Every edge in (from, to) order
    pub fn iter(&self) -> impl Iterator<Item = (&BasePattern, &BasePattern, &TransferAttribute)> + '_ {
        self.forward
            .iter()
            .flat_map(|(from, edges)| edges.iter().map(move |(to, attr)| (from, to, attr)))
    }

    /// Registered source patterns
    pub fn from_patterns(&self) -> impl Iterator<Item = &BasePattern> + '_ {
        self.forward.keys()
    }

    /// Registered target patterns
    pub fn to_patterns(&self) -> impl Iterator<Item = &BasePattern> + '_ {
        self.backward.keys()
    }

    /// Every registered source pattern matching `base`, in pattern order
    pub fn matches_all_from(&self, base: &Base) -> Vec<&BasePattern> {
        match &self.index {
            Some(index) => index.matches(base).into_iter().collect(),
            None => self
                .forward
                .keys()
                .filter(|pattern| pattern.matches(base))
                .collect(),
        }
    }

    /// The registered source pattern matching `base`.
    ///
    /// If several match, the first in pattern order wins.
    pub fn matches_from(&self, base: &Base) -> Option<&BasePattern> {
        let matched = self.matches_all_from(base);
        if matched.len() > 1 {
            tracing::debug!(
                "{} source patterns match {}, using {}",
                matched.len(),
                base,
                matched[0]
            );
        }
        matched.into_iter().next()
    }

    /// Sub-table of the edges leaving the given patterns
    pub fn projection<'a, I>(&self, patterns: I) -> TransferRules
    where
        I: IntoIterator<Item = &'a BasePattern>,
    {
        let mut projected = TransferRules::new(self.is_indexed());
        for from in patterns {
            for (to, attr) in self.forward.get(from).into_iter().flatten() {
                projected.insert_edge(from.clone(), to.clone(), *attr);
            }
        }
        projected
    }

    /// Sub-table of the edges entering the given patterns
    pub fn inverse_projection<'a, I>(&self, patterns: I) -> TransferRules
    where
        I: IntoIterator<Item = &'a BasePattern>,
    {
        let mut projected = TransferRules::new(self.is_indexed());
        for to in patterns {
            for from in self.backward.get(to).into_iter().flatten() {
                if let Some(attr) = self.get(from, to) {
                    projected.insert_edge(from.clone(), to.clone(), *attr);
                }
            }
        }
        projected
    }

    /// Sum of the numeric payloads of the edges leaving `from`.
    ///
    /// `None` when `from` has no `Ratio`/`Multiply` edges.
    pub fn total_value(&self, from: &BasePattern) -> Result<Option<Decimal>> {
        let mut total: Option<Decimal> = None;
        for value in self
            .forward
            .get(from)
            .into_iter()
            .flat_map(|edges| edges.values())
            .filter_map(TransferAttribute::value)
        {
            let sum = total.unwrap_or(Decimal::ZERO);
            total = Some(
                sum.checked_add(value)
                    .ok_or_else(|| overflow("adding", sum, value))?,
            );
        }
        Ok(total)
    }

    // ---------------------------------------------------------------------
    // Transformation
    // ---------------------------------------------------------------------

    /// Bases `base` is transferred to. `{base}` if no rule matches.
    pub fn transform(&self, base: &Base) -> Result<BTreeSet<Base>> {
        let Some((_, edges)) = self.matched_edges(base) else {
            return Ok(BTreeSet::from([base.clone()]));
        };

        edges
            .iter()
            .map(|(to, attr)| target_base(to, attr, base))
            .collect()
    }

    /// Transfer one value. `None` if no rule matches `base`.
    ///
    /// Outputs landing on the same base are summed.
    pub fn transfer_value(&self, base: &Base, value: Decimal) -> Result<Option<BaseValues>> {
        let Some((from, edges)) = self.matched_edges(base) else {
            return Ok(None);
        };

        let ratio_total = match self.from_kind(from) {
            Some(AttributeKind::Ratio) => self.total_value(from)?.unwrap_or(Decimal::ZERO),
            _ => Decimal::ZERO,
        };

        let mut transferred = BaseValues::new();
        for (to, attr) in edges {
            let amount = match attr {
                TransferAttribute::Aggregate | TransferAttribute::HatAggregate => value,
                TransferAttribute::Ratio(weight) => ratio_share(value, *weight, ratio_total, from)?,
                TransferAttribute::Multiply(factor) => value
                    .checked_mul(*factor)
                    .ok_or_else(|| overflow("multiplying", value, *factor))?,
            };
            transferred
                .try_add(target_base(to, attr, base)?, amount)
                .map_err(sum_overflow)?;
        }

        Ok(Some(transferred))
    }

    /// Transfer a whole collection.
    ///
    /// Unmatched entries pass through; every output is merged by base.
    /// The input is left untouched.
    pub fn transfer(&self, values: &BaseValues) -> Result<BaseValues> {
        self.transfer_counted(values).map(|(output, _)| output)
    }

    /// [`transfer`](Self::transfer), also returning how many entries matched
    pub(crate) fn transfer_counted(&self, values: &BaseValues) -> Result<(BaseValues, usize)> {
        let mut output = BaseValues::new();
        let mut matched = 0usize;

        for (base, value) in values.iter() {
            match self.transfer_value(base, value)? {
                Some(transferred) => {
                    matched += 1;
                    output.try_merge(&transferred).map_err(sum_overflow)?;
                }
                None => output.try_add(base.clone(), value).map_err(sum_overflow)?,
            }
        }

        tracing::debug!(
            "Transferred {} of {} entries into {} entries",
            matched,
            values.len(),
            output.len()
        );
        Ok((output, matched))
    }

    fn matched_edges(&self, base: &Base) -> Option<(&BasePattern, &Edges)> {
        let from = self.matches_from(base)?;
        self.forward.get(from).map(|edges| (from, edges))
    }
}

/// Concrete target of one edge. `HatAggregate` flips the source polarity
/// before the target pattern is applied.
fn target_base(to: &BasePattern, attr: &TransferAttribute, base: &Base) -> Result<Base> {
    match attr.kind() {
        AttributeKind::HatAggregate => to.translate(&base.flip_polarity()),
        AttributeKind::Aggregate | AttributeKind::Ratio | AttributeKind::Multiply => {
            to.translate(base)
        }
    }
}

fn ratio_share(value: Decimal, weight: Decimal, total: Decimal, from: &BasePattern) -> Result<Decimal> {
    if total.is_zero() {
        if value.is_zero() {
            return Ok(Decimal::ZERO);
        }
        return Err(Error::DivisionByZero(format!(
            "ratio weights of {} sum to zero, cannot distribute {}",
            from, value
        )));
    }

    value
        .checked_mul(weight)
        .and_then(|scaled| scaled.checked_div(total))
        .ok_or_else(|| overflow("distributing", value, weight))
}
