//! Operation validate/apply contract
//!
//! Every operation kind implements [`OperationKind`]. [`OperationBody`] is the
//! closed set of kinds, and [`OperationFrame`] drives one execution attempt of one
//! operation through its lifecycle:
//!
//! ```text
//! Created -> Validating -> Rejected
//!                       -> Validated -> Applying -> Applied
//!                                                -> Failed
//! ```
//!
//! `Rejected`, `Applied` and `Failed` are terminal. Each terminal state carries
//! exactly one [`OperationResult`]. Retrying is the orchestrator's business.

use crate::{
    bump_sequence::BumpSequenceOp,
    delta::LedgerDelta,
    metrics::OperationObserver,
    result::{OperationResult, ResultCode},
    types::{AccountId, LedgerHeader, ThresholdLevel},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Operation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Account the operation acts on; defaults to the transaction source
    #[serde(default)]
    pub source_account: Option<AccountId>,

    /// Kind-specific payload
    pub body: OperationBody,
}

impl Operation {
    /// Operation acting on the transaction's source account
    pub fn new(body: OperationBody) -> Self {
        Self {
            source_account: None,
            body,
        }
    }

    /// Operation acting on an explicit source account
    pub fn with_source(source_account: AccountId, body: OperationBody) -> Self {
        Self {
            source_account: Some(source_account),
            body,
        }
    }
}

/// Closed set of operation kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationBody {
    /// Fast-forward an account's sequence number
    BumpSequence(BumpSequenceOp),
}

impl OperationBody {
    /// Metric/log name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            OperationBody::BumpSequence(_) => BumpSequenceOp::NAME,
        }
    }

    /// Threshold category required to authorize this kind
    pub fn threshold_level(&self) -> ThresholdLevel {
        match self {
            OperationBody::BumpSequence(op) => op.threshold_level(),
        }
    }

    fn check_valid(&self, scope: &OperationScope<'_>) -> std::result::Result<(), OperationResult> {
        match self {
            OperationBody::BumpSequence(op) => check_kind(op, scope),
        }
    }

    fn apply(
        &self,
        scope: &OperationScope<'_>,
        delta: &mut LedgerDelta,
    ) -> Result<OperationResult> {
        match self {
            OperationBody::BumpSequence(op) => apply_kind(op, scope, delta),
        }
    }
}

fn check_kind<K: OperationKind>(
    kind: &K,
    scope: &OperationScope<'_>,
) -> std::result::Result<(), OperationResult> {
    kind.check_valid(scope)
        .map_err(|code| OperationResult::Inner(code.into()))
}

fn apply_kind<K: OperationKind>(
    kind: &K,
    scope: &OperationScope<'_>,
    delta: &mut LedgerDelta,
) -> Result<OperationResult> {
    let code = match kind.apply(scope, delta)? {
        Ok(()) => K::Code::SUCCESS,
        Err(code) => code,
    };
    Ok(OperationResult::Inner(code.into()))
}

/// Identities and header an operation kind sees
#[derive(Debug, Clone, Copy)]
pub struct OperationScope<'a> {
    /// Header of the ledger being built
    pub header: LedgerHeader,
    /// Top-level source account of the containing transaction
    pub tx_source: &'a AccountId,
    /// Account this operation acts on
    pub source_id: &'a AccountId,
}

/// Business rules of one operation kind
pub trait OperationKind {
    /// Result codes of this kind
    type Code: ResultCode;

    /// Metric/log name
    const NAME: &'static str;

    /// Threshold category required to authorize this kind
    fn threshold_level(&self) -> ThresholdLevel;

    /// Ordered precondition checks. Must not touch ledger state.
    fn check_valid(&self, scope: &OperationScope<'_>) -> std::result::Result<(), Self::Code>;

    /// Apply the operation through the change log.
    ///
    /// The outer `Result` carries storage failures; the inner one the business
    /// outcome. The source account is guaranteed to exist.
    fn apply(
        &self,
        scope: &OperationScope<'_>,
        delta: &mut LedgerDelta,
    ) -> Result<std::result::Result<(), Self::Code>>;
}

/// Explicit ledger state handed to validate/apply
pub struct LedgerContext<'a> {
    /// Change log of the containing transaction
    pub delta: &'a mut LedgerDelta,
    /// Outcome reporter
    pub observer: &'a dyn OperationObserver,
}

impl<'a> LedgerContext<'a> {
    /// Create new context
    pub fn new(delta: &'a mut LedgerDelta, observer: &'a dyn OperationObserver) -> Self {
        Self { delta, observer }
    }
}

/// Lifecycle state of one operation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// Not yet validated
    Created,
    /// Validation in progress
    Validating,
    /// Validation failed (terminal)
    Rejected,
    /// Validation passed
    Validated,
    /// Apply in progress; stays here if apply hit a storage error
    Applying,
    /// Applied successfully (terminal)
    Applied,
    /// Apply failed (terminal)
    Failed,
}

impl OperationState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Rejected | OperationState::Applied | OperationState::Failed
        )
    }
}

/// One execution attempt of one operation
#[derive(Debug)]
pub struct OperationFrame<'a> {
    operation: &'a Operation,
    tx_source: &'a AccountId,
    state: OperationState,
    result: Option<OperationResult>,
}

impl<'a> OperationFrame<'a> {
    /// Start an attempt of `operation` inside a transaction from `tx_source`
    pub fn new(operation: &'a Operation, tx_source: &'a AccountId) -> Self {
        Self {
            operation,
            tx_source,
            state: OperationState::Created,
            result: None,
        }
    }

    /// The operation being executed
    pub fn operation(&self) -> &'a Operation {
        self.operation
    }

    /// Account the operation acts on
    pub fn source_id(&self) -> &'a AccountId {
        self.operation
            .source_account
            .as_ref()
            .unwrap_or(self.tx_source)
    }

    /// Threshold category required to authorize the operation
    pub fn threshold_level(&self) -> ThresholdLevel {
        self.operation.body.threshold_level()
    }

    /// Lifecycle state
    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Recorded outcome, set once the attempt is terminal
    pub fn result(&self) -> Option<OperationResult> {
        self.result
    }

    fn scope(&self, header: LedgerHeader) -> OperationScope<'a> {
        OperationScope {
            header,
            tx_source: self.tx_source,
            source_id: self.source_id(),
        }
    }

    /// Run the precondition checks. On failure the failure code is recorded.
    pub fn check_valid(&mut self, ctx: &LedgerContext<'_>) -> bool {
        if self.state != OperationState::Created {
            warn!(
                operation = self.operation.body.name(),
                state = ?self.state,
                "check_valid called twice on the same attempt"
            );
            return false;
        }

        self.state = OperationState::Validating;
        let scope = self.scope(*ctx.delta.header());

        match self.operation.body.check_valid(&scope) {
            Ok(()) => {
                self.state = OperationState::Validated;
                true
            }
            Err(result) => {
                self.finish(OperationState::Rejected, result, ctx.observer);
                false
            }
        }
    }

    /// Apply the operation through the context's change log.
    ///
    /// `Ok(false)` means a recorded business failure; `Err` means storage broke or
    /// the frame was not validated first.
    pub fn apply(&mut self, ctx: &mut LedgerContext<'_>) -> Result<bool> {
        if self.state != OperationState::Validated {
            return Err(Error::InvariantViolation(format!(
                "apply of {} in state {:?}",
                self.operation.body.name(),
                self.state
            )));
        }

        self.state = OperationState::Applying;
        let scope = self.scope(*ctx.delta.header());

        let result = self.operation.body.apply(&scope, ctx.delta)?;
        let applied = result.is_success();
        let state = if applied {
            OperationState::Applied
        } else {
            OperationState::Failed
        };
        self.finish(state, result, ctx.observer);
        Ok(applied)
    }

    /// Fail a validated attempt because its source account is missing
    pub fn fail_missing_source(&mut self, observer: &dyn OperationObserver) -> Result<()> {
        if !matches!(self.state, OperationState::Validated | OperationState::Applying) {
            return Err(Error::InvariantViolation(format!(
                "missing source on {} in state {:?}",
                self.operation.body.name(),
                self.state
            )));
        }

        self.finish(OperationState::Failed, OperationResult::NoAccount, observer);
        Ok(())
    }

    fn finish(
        &mut self,
        state: OperationState,
        result: OperationResult,
        observer: &dyn OperationObserver,
    ) {
        self.state = state;
        self.result = Some(result);

        debug!(
            operation = self.operation.body.name(),
            source = %self.source_id(),
            state = ?state,
            outcome = result.label(),
            "Operation finished"
        );

        observer.record_outcome(self.operation.body.name(), result.label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountEntry;
    use crate::metrics::{Metrics, NoopObserver};
    use crate::result::BumpSequenceResultCode;
    use crate::storage::{AccountStore, MemoryStore};
    use crate::types::SequenceNumber;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn delta(seq: u64) -> LedgerDelta {
        let store = Arc::new(MemoryStore::new());
        let header = LedgerHeader::new(1, 10);
        store
            .commit(
                &header,
                &[
                    AccountEntry::new(AccountId::new("GTX"), Decimal::ONE, SequenceNumber::new(1)),
                    AccountEntry::new(
                        AccountId::new("GOP"),
                        Decimal::ONE,
                        SequenceNumber::new(seq),
                    ),
                ],
            )
            .unwrap();
        LedgerDelta::new(header, store)
    }

    fn bump(bump_to: u64) -> Operation {
        Operation::with_source(
            AccountId::new("GOP"),
            OperationBody::BumpSequence(BumpSequenceOp::new(SequenceNumber::new(bump_to))),
        )
    }

    #[test]
    fn test_source_defaults_to_transaction_source() {
        let tx_source = AccountId::new("GTX");
        let op = Operation::new(OperationBody::BumpSequence(BumpSequenceOp::new(
            SequenceNumber::new(1),
        )));
        let frame = OperationFrame::new(&op, &tx_source);
        assert_eq!(frame.source_id(), &tx_source);
        assert_eq!(frame.threshold_level(), ThresholdLevel::Low);
    }

    #[test]
    fn test_lifecycle_to_applied() {
        let mut delta = delta(5);
        let observer = Metrics::new().unwrap();
        let tx_source = AccountId::new("GTX");
        let op = bump(9);

        let mut frame = OperationFrame::new(&op, &tx_source);
        assert_eq!(frame.state(), OperationState::Created);

        let mut ctx = LedgerContext::new(&mut delta, &observer);
        assert!(frame.check_valid(&ctx));
        assert_eq!(frame.state(), OperationState::Validated);
        assert_eq!(frame.result(), None);

        assert!(frame.apply(&mut ctx).unwrap());
        assert_eq!(frame.state(), OperationState::Applied);
        assert_eq!(
            frame.result(),
            Some(OperationResult::from(BumpSequenceResultCode::Success))
        );
        assert_eq!(observer.outcome_count("op-bump-sequence", "success"), 1);
    }

    #[test]
    fn test_apply_requires_validation() {
        let mut delta = delta(5);
        let tx_source = AccountId::new("GTX");
        let op = bump(9);
        let mut frame = OperationFrame::new(&op, &tx_source);

        let mut ctx = LedgerContext::new(&mut delta, &NoopObserver);
        assert!(matches!(
            frame.apply(&mut ctx),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_outcome_recorded_once() {
        let mut delta = delta(5);
        let observer = Metrics::new().unwrap();
        let tx_source = AccountId::new("GOP");
        let op = bump(9);
        let mut frame = OperationFrame::new(&op, &tx_source);

        let ctx = LedgerContext::new(&mut delta, &observer);
        assert!(!frame.check_valid(&ctx));
        assert!(!frame.check_valid(&ctx));
        assert_eq!(frame.state(), OperationState::Rejected);
        assert_eq!(observer.outcome_count("op-bump-sequence", "no-self-bump"), 1);
    }

    #[test]
    fn test_fail_missing_source() {
        let mut delta = delta(5);
        let observer = Metrics::new().unwrap();
        let tx_source = AccountId::new("GTX");
        let op = bump(9);
        let mut frame = OperationFrame::new(&op, &tx_source);

        let ctx = LedgerContext::new(&mut delta, &observer);
        assert!(frame.check_valid(&ctx));
        frame.fail_missing_source(&observer).unwrap();

        assert_eq!(frame.state(), OperationState::Failed);
        assert_eq!(frame.result(), Some(OperationResult::NoAccount));
        assert_eq!(observer.outcome_count("op-bump-sequence", "no-account"), 1);

        // Terminal now, so a second report is refused
        assert!(matches!(
            frame.fail_missing_source(&observer),
            Err(Error::InvariantViolation(_))
        ));
        assert_eq!(observer.outcome_count("op-bump-sequence", "no-account"), 1);
    }

    #[test]
    fn test_fail_missing_source_requires_validation() {
        let tx_source = AccountId::new("GTX");
        let op = bump(9);
        let mut frame = OperationFrame::new(&op, &tx_source);

        assert!(matches!(
            frame.fail_missing_source(&NoopObserver),
            Err(Error::InvariantViolation(_))
        ));
        assert_eq!(frame.state(), OperationState::Created);
        assert_eq!(frame.result(), None);
    }
}
