//! DelTran Ledger Operations
//!
//! Validate/apply protocol for state-mutating operations against an
//! account-based ledger, with the bump-sequence operation as its first kind.
//!
//! # Architecture
//!
//! - **Two-phase operations**: ordered, side-effect-free validation, then apply
//! - **Explicit state**: operations see a [`LedgerContext`], never a global handle
//! - **Change log**: every mutation goes through a [`LedgerDelta`] that commits atomically
//! - **Injected telemetry**: outcomes are reported to an [`OperationObserver`]
//!
//! # Invariants
//!
//! - Sequence numbers never decrease
//! - Exactly one result code per operation attempt
//! - A failed transaction leaves no trace in the store

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    clippy::all
)]

pub mod account;
pub mod bump_sequence;
pub mod config;
pub mod crypto;
pub mod delta;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod operation;
pub mod result;
pub mod storage;
pub mod transaction;
pub mod types;

// Re-exports
pub use account::{AccountEntry, Signer, Thresholds};
pub use bump_sequence::{BumpSequenceOp, SequenceRange, BUMP_SEQUENCE_MIN_PROTOCOL_VERSION};
pub use config::Config;
pub use delta::{Checkpoint, LedgerChange, LedgerDelta};
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use metrics::{Metrics, NoopObserver, OperationObserver};
pub use operation::{
    LedgerContext, Operation, OperationBody, OperationFrame, OperationKind, OperationScope,
    OperationState,
};
pub use result::{BumpSequenceResultCode, InnerResult, OperationResult, ResultCode};
pub use storage::{AccountStore, MemoryStore, Storage};
pub use transaction::{Transaction, TransactionResult, TransactionResultCode};
pub use types::{AccountId, LedgerHeader, SequenceNumber, ThresholdLevel};
