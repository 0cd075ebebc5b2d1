//! Metrics collection for observability
//!
//! Operations report their terminal outcome to an injected [`OperationObserver`]
//! once the outcome is decided. Observers never influence control flow.
//!
//! # Metrics
//!
//! - `ledger_operation_outcomes_total{operation,outcome}` - Terminal operation outcomes
//! - `ledger_transactions_total{result}` - Applied transactions by result
//! - `ledger_changes_committed_total` - Account entries written by commits

use crate::Result;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Receiver of operation and transaction outcomes
pub trait OperationObserver: Send + Sync {
    /// One operation attempt reached a terminal outcome
    fn record_outcome(&self, operation: &'static str, outcome: &'static str);

    /// One transaction finished applying
    fn record_transaction(&self, _result: &'static str) {}

    /// A change log was committed
    fn record_commit(&self, _accounts: usize) {}
}

/// Observer that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl OperationObserver for NoopObserver {
    fn record_outcome(&self, _operation: &'static str, _outcome: &'static str) {}
}

/// Prometheus metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Terminal operation outcomes
    pub operation_outcomes: IntCounterVec,

    /// Applied transactions
    pub transactions_total: IntCounterVec,

    /// Account entries written
    pub changes_committed: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let operation_outcomes = IntCounterVec::new(
            Opts::new(
                "ledger_operation_outcomes_total",
                "Terminal operation outcomes by kind and result code",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operation_outcomes.clone()))?;

        let transactions_total = IntCounterVec::new(
            Opts::new("ledger_transactions_total", "Applied transactions by result"),
            &["result"],
        )?;
        registry.register(Box::new(transactions_total.clone()))?;

        let changes_committed = IntCounter::new(
            "ledger_changes_committed_total",
            "Account entries written by change log commits",
        )?;
        registry.register(Box::new(changes_committed.clone()))?;

        Ok(Self {
            operation_outcomes,
            transactions_total,
            changes_committed,
            registry,
        })
    }

    /// Count for one operation/outcome pair
    pub fn outcome_count(&self, operation: &str, outcome: &str) -> u64 {
        self.operation_outcomes
            .with_label_values(&[operation, outcome])
            .get()
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl OperationObserver for Metrics {
    fn record_outcome(&self, operation: &'static str, outcome: &'static str) {
        self.operation_outcomes
            .with_label_values(&[operation, outcome])
            .inc();
    }

    fn record_transaction(&self, result: &'static str) {
        self.transactions_total.with_label_values(&[result]).inc();
    }

    fn record_commit(&self, accounts: usize) {
        self.changes_committed.inc_by(accounts as u64);
    }
}
