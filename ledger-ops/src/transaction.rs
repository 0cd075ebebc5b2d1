//! Transaction driver
//!
//! Runs the operations of one transaction through the two-phase contract:
//! every operation is validated first, then the source sequence number is
//! consumed and the operations are applied in order against one change log.
//! Any failure rolls the change log back to where the transaction started.
//!
//! Signature weights and fees are not checked here.

use crate::{
    crypto::hash_bytes,
    delta::LedgerDelta,
    metrics::OperationObserver,
    operation::{LedgerContext, Operation, OperationFrame},
    result::OperationResult,
    types::{AccountId, SequenceNumber, ThresholdLevel},
    Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Ordered operations authorized by one source account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Top-level source account
    pub source_account: AccountId,

    /// Must be the source account's sequence number plus one
    pub seq_num: SequenceNumber,

    /// Operations, applied in order
    pub operations: Vec<Operation>,
}

impl Transaction {
    /// Create new transaction
    pub fn new(
        source_account: AccountId,
        seq_num: impl Into<SequenceNumber>,
        operations: Vec<Operation>,
    ) -> Self {
        Self {
            source_account,
            seq_num: seq_num.into(),
            operations,
        }
    }

    /// SHA-256 over the canonical (bincode) encoding
    pub fn hash(&self) -> Result<[u8; 32]> {
        Ok(hash_bytes(&bincode::serialize(self)?))
    }

    /// Threshold level each operation needs, for the external signature check
    pub fn threshold_levels(&self) -> Vec<ThresholdLevel> {
        self.operations
            .iter()
            .map(|op| op.body.threshold_level())
            .collect()
    }
}

/// Transaction-level outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionResultCode {
    /// All operations applied
    Success,
    /// An operation was rejected or failed
    Failed,
    /// No operations
    MissingOperation,
    /// Source account does not exist
    NoAccount,
    /// Sequence number is not the source's next one
    BadSeq,
}

impl TransactionResultCode {
    /// Stable label
    pub fn label(&self) -> &'static str {
        match self {
            TransactionResultCode::Success => "success",
            TransactionResultCode::Failed => "failed",
            TransactionResultCode::MissingOperation => "missing-operation",
            TransactionResultCode::NoAccount => "no-account",
            TransactionResultCode::BadSeq => "bad-seq",
        }
    }
}

impl fmt::Display for TransactionResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Result of one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// Transaction-level code
    pub code: TransactionResultCode,

    /// Per-operation outcome; `None` for operations that never reached a
    /// terminal state
    pub operation_results: Vec<Option<OperationResult>>,
}

impl TransactionResult {
    fn without_operations(code: TransactionResultCode, operations: usize) -> Self {
        Self {
            code,
            operation_results: vec![None; operations],
        }
    }

    /// Whether the transaction applied
    pub fn is_success(&self) -> bool {
        self.code == TransactionResultCode::Success
    }
}

/// Validate and apply `tx` against `delta`.
///
/// On anything but success, `delta` is left exactly as it was on entry.
pub fn apply_transaction(
    tx: &Transaction,
    delta: &mut LedgerDelta,
    observer: &dyn OperationObserver,
) -> Result<TransactionResult> {
    let checkpoint = delta.checkpoint();

    let outcome = run(tx, delta, observer);
    match &outcome {
        Ok(result) if result.is_success() => {}
        _ => delta.rollback_to(checkpoint),
    }

    if let Ok(result) = &outcome {
        info!(
            source = %tx.source_account,
            seq_num = %tx.seq_num,
            operations = tx.operations.len(),
            result = result.code.label(),
            "Transaction applied"
        );
        observer.record_transaction(result.code.label());
    }

    outcome
}

fn run(
    tx: &Transaction,
    delta: &mut LedgerDelta,
    observer: &dyn OperationObserver,
) -> Result<TransactionResult> {
    let operations = tx.operations.len();

    if tx.operations.is_empty() {
        return Ok(TransactionResult::without_operations(
            TransactionResultCode::MissingOperation,
            0,
        ));
    }

    let Some(source) = delta.load_account(&tx.source_account)? else {
        return Ok(TransactionResult::without_operations(
            TransactionResultCode::NoAccount,
            operations,
        ));
    };

    if source.next_seq_num() != Some(tx.seq_num) {
        debug!(
            source = %tx.source_account,
            current = %source.seq_num(),
            seq_num = %tx.seq_num,
            "Bad transaction sequence number"
        );
        return Ok(TransactionResult::without_operations(
            TransactionResultCode::BadSeq,
            operations,
        ));
    }

    let mut frames: Vec<OperationFrame<'_>> = tx
        .operations
        .iter()
        .map(|op| OperationFrame::new(op, &tx.source_account))
        .collect();

    let mut ctx = LedgerContext::new(delta, observer);

    let mut all_valid = true;
    for frame in frames.iter_mut() {
        all_valid &= frame.check_valid(&ctx);
    }

    if all_valid {
        ctx.delta
            .set_sequence_number(&tx.source_account, tx.seq_num)?;
        for frame in frames.iter_mut() {
            if !ctx.delta.account_exists(frame.source_id())? {
                frame.fail_missing_source(observer)?;
                all_valid = false;
                break;
            }
            if !frame.apply(&mut ctx)? {
                all_valid = false;
                break;
            }
        }
    }

    let code = if all_valid {
        TransactionResultCode::Success
    } else {
        TransactionResultCode::Failed
    };

    Ok(TransactionResult {
        code,
        operation_results: frames.iter().map(|frame| frame.result()).collect(),
    })
}
