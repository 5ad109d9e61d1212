//! Shared rule engine
//!
//! Wraps a [`TransferRules`] table for use from several threads. Writers
//! (`put`, `set`, removals) take an exclusive lock, transfers and queries
//! a shared one, so every transfer sees one consistent snapshot of the
//! table.

use crate::{
    attribute::TransferAttribute,
    config::Config,
    metrics::Metrics,
    pattern::BasePattern,
    rules::TransferRules,
    Error, Result,
};
use ledger_core::{Base, BaseValues};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// Thread-safe, instrumented rule engine
#[derive(Debug)]
pub struct RuleEngine {
    /// Rule table
    rules: RwLock<TransferRules>,

    /// Metrics (None when disabled)
    metrics: Option<Metrics>,

    /// Configuration
    config: Config,
}

impl RuleEngine {
    /// Create engine with an empty table
    pub fn new(config: Config) -> Result<Self> {
        Self::with_rules(config, None)
    }

    /// Create engine around existing rules.
    ///
    /// The edges of `rules` are re-registered into a table built from
    /// `config`, so the index setting of `config` always applies.
    pub fn with_rules(config: Config, rules: Option<&TransferRules>) -> Result<Self> {
        config.validate()?;

        let mut table = TransferRules::from_config(&config);
        if let Some(rules) = rules {
            table.put_all(rules)?;
        }

        let metrics = if config.metrics.enabled {
            let metrics = Metrics::new(&config.metrics.namespace)?;
            metrics.update_rule_edges(table.len());
            Some(metrics)
        } else {
            None
        };

        tracing::info!(
            "Rule engine {} v{} ready: {} edges, index {}",
            config.service_name,
            config.service_version,
            table.len(),
            if config.index.enabled { "on" } else { "off" }
        );

        Ok(Self {
            rules: RwLock::new(table),
            metrics,
            config,
        })
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics, if enabled
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Insert a new edge (see [`TransferRules::put`])
    pub fn put(&self, from: BasePattern, to: BasePattern, attr: TransferAttribute) -> Result<()> {
        self.mutate(|rules| rules.put(from, to, attr))
    }

    /// Assign an edge (see [`TransferRules::set`])
    pub fn set(
        &self,
        from: BasePattern,
        to: BasePattern,
        attr: TransferAttribute,
    ) -> Result<Option<TransferAttribute>> {
        self.mutate(|rules| rules.set(from, to, attr))
    }

    /// Insert every edge of `other`, all or nothing
    pub fn put_all(&self, other: &TransferRules) -> Result<()> {
        self.mutate(|rules| rules.put_all(other))
    }

    /// Remove one edge
    pub fn remove(&self, from: &BasePattern, to: &BasePattern) -> bool {
        self.mutate_infallible(|rules| rules.remove(from, to))
    }

    /// Remove every edge leaving `from`
    pub fn remove_from(&self, from: &BasePattern) -> bool {
        self.mutate_infallible(|rules| rules.remove_from(from))
    }

    /// Remove every edge entering `to`
    pub fn remove_to(&self, to: &BasePattern) -> bool {
        self.mutate_infallible(|rules| rules.remove_to(to))
    }

    /// Remove every edge
    pub fn clear(&self) {
        self.mutate_infallible(TransferRules::clear);
        tracing::info!("Rule table cleared");
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Copy of the current table
    pub fn snapshot(&self) -> TransferRules {
        self.rules.read().clone()
    }

    /// Bases `base` is transferred to
    pub fn transform(&self, base: &Base) -> Result<BTreeSet<Base>> {
        self.rules.read().transform(base)
    }

    /// Transfer one value (see [`TransferRules::transfer_value`])
    pub fn transfer_value(&self, base: &Base, value: Decimal) -> Result<Option<BaseValues>> {
        let transferred = self.rules.read().transfer_value(base, value)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_transfer(1, usize::from(transferred.is_some()));
        }
        Ok(transferred)
    }

    /// Transfer a whole collection (see [`TransferRules::transfer`])
    pub fn transfer(&self, values: &BaseValues) -> Result<BaseValues> {
        let (output, matched) = self.rules.read().transfer_counted(values)?;

        if let Some(metrics) = &self.metrics {
            metrics.record_transfer(values.len(), matched);
        }
        tracing::info!(
            "Transfer complete: {} entries ({} matched) → {} entries, total {} → {}",
            values.len(),
            matched,
            output.len(),
            display_total(values),
            display_total(&output)
        );

        Ok(output)
    }

    fn mutate<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut TransferRules) -> Result<T>,
    {
        let mut rules = self.rules.write();
        let result = op(&mut *rules);

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(_) => metrics.update_rule_edges(rules.len()),
                Err(Error::Conflict(_) | Error::InvalidValue(_)) => metrics.record_rejection(),
                Err(_) => {}
            }
        }
        result
    }

    fn mutate_infallible<T, F>(&self, op: F) -> T
    where
        F: FnOnce(&mut TransferRules) -> T,
    {
        let mut rules = self.rules.write();
        let result = op(&mut *rules);
        if let Some(metrics) = &self.metrics {
            metrics.update_rule_edges(rules.len());
        }
        result
    }
}

fn display_total(values: &BaseValues) -> String {
    values
        .try_total()
        .map_or_else(|| "overflow".to_string(), |total| total.to_string())
}
