//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the rule engine.
//! Every collector lives on the engine's own registry, so several engines
//! can coexist in one process.
//!
//! # Metrics
//!
//! - `<ns>_rule_edges` - Current number of rule edges
//! - `<ns>_transfers_total` - Entries submitted for transfer
//! - `<ns>_matched_total` - Entries matched by a source pattern
//! - `<ns>_passthrough_total` - Entries passed through unchanged
//! - `<ns>_rejected_mutations_total` - Rejected `put`/`set` calls

use prometheus::{IntCounter, IntGauge, Opts, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Current edge count
    pub rule_edges: IntGauge,

    /// Entries submitted for transfer
    pub transfers_total: IntCounter,

    /// Entries matched by a source pattern
    pub matched_total: IntCounter,

    /// Entries passed through unchanged
    pub passthrough_total: IntCounter,

    /// Rejected mutations
    pub rejected_mutations_total: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new(namespace: &str) -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let rule_edges = IntGauge::with_opts(
            Opts::new("rule_edges", "Current number of rule edges").namespace(namespace),
        )?;
        registry.register(Box::new(rule_edges.clone()))?;

        let transfers_total = IntCounter::with_opts(
            Opts::new("transfers_total", "Entries submitted for transfer").namespace(namespace),
        )?;
        registry.register(Box::new(transfers_total.clone()))?;

        let matched_total = IntCounter::with_opts(
            Opts::new("matched_total", "Entries matched by a source pattern")
                .namespace(namespace),
        )?;
        registry.register(Box::new(matched_total.clone()))?;

        let passthrough_total = IntCounter::with_opts(
            Opts::new("passthrough_total", "Entries passed through unchanged")
                .namespace(namespace),
        )?;
        registry.register(Box::new(passthrough_total.clone()))?;

        let rejected_mutations_total = IntCounter::with_opts(
            Opts::new("rejected_mutations_total", "Rejected rule mutations").namespace(namespace),
        )?;
        registry.register(Box::new(rejected_mutations_total.clone()))?;

        Ok(Self {
            rule_edges,
            transfers_total,
            matched_total,
            passthrough_total,
            rejected_mutations_total,
            registry,
        })
    }

    /// Record a transfer batch
    pub fn record_transfer(&self, entries: usize, matched: usize) {
        self.transfers_total.inc_by(entries as u64);
        self.matched_total.inc_by(matched as u64);
        self.passthrough_total
            .inc_by(entries.saturating_sub(matched) as u64);
    }

    /// Record a rejected mutation
    pub fn record_rejection(&self) {
        self.rejected_mutations_total.inc();
    }

    /// Update edge count
    pub fn update_rule_edges(&self, edges: usize) {
        self.rule_edges.set(edges as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("rule_edges", &self.rule_edges.get())
            .field("transfers_total", &self.transfers_total.get())
            .field("matched_total", &self.matched_total.get())
            .field("passthrough_total", &self.passthrough_total.get())
            .field("rejected_mutations_total", &self.rejected_mutations_total.get())
            .finish()
    }
}
