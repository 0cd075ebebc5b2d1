//! Bump-sequence operation
//!
//! Fast-forwards an account's sequence number, typically to invalidate ledger
//! state created under lower sequence numbers. The bump is a monotonic ratchet:
//! the new value is `max(bump_to, current)`, so asking for a lower value is a
//! successful no-op.

use crate::{
    delta::LedgerDelta,
    operation::{OperationKind, OperationScope},
    result::BumpSequenceResultCode,
    types::{SequenceNumber, ThresholdLevel},
    Error, Result,
};
use serde::{Deserialize, Serialize};

/// First protocol version that knows this operation
pub const BUMP_SEQUENCE_MIN_PROTOCOL_VERSION: u32 = 9;

/// Inclusive window the current sequence number must be in at apply time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRange {
    /// Lowest allowed current sequence number
    pub min: SequenceNumber,
    /// Highest allowed current sequence number
    pub max: SequenceNumber,
}

impl SequenceRange {
    /// Create new range
    pub fn new(min: impl Into<SequenceNumber>, max: impl Into<SequenceNumber>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    /// Whether `max >= min`
    pub fn is_well_formed(&self) -> bool {
        self.max >= self.min
    }
}

/// Bump-sequence payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BumpSequenceOp {
    /// Requested sequence number
    pub bump_to: SequenceNumber,

    /// Optional precondition on the current sequence number
    #[serde(default)]
    pub range: Option<SequenceRange>,
}

impl BumpSequenceOp {
    /// Unconditional bump
    pub fn new(bump_to: impl Into<SequenceNumber>) -> Self {
        Self {
            bump_to: bump_to.into(),
            range: None,
        }
    }

    /// Bump guarded by a range precondition
    pub fn with_range(bump_to: impl Into<SequenceNumber>, range: SequenceRange) -> Self {
        Self {
            bump_to: bump_to.into(),
            range: Some(range),
        }
    }
}

impl OperationKind for BumpSequenceOp {
    type Code = BumpSequenceResultCode;

    const NAME: &'static str = "op-bump-sequence";

    fn threshold_level(&self) -> ThresholdLevel {
        // Cannot move funds or change authority
        ThresholdLevel::Low
    }

    fn check_valid(&self, scope: &OperationScope<'_>) -> std::result::Result<(), Self::Code> {
        if scope.header.current_ledger_version() < BUMP_SEQUENCE_MIN_PROTOCOL_VERSION {
            return Err(BumpSequenceResultCode::NotSupportedYet);
        }

        // The transaction source's sequence number is consumed by the
        // transaction itself and cannot be rewritten in the same step.
        if scope.tx_source == scope.source_id {
            return Err(BumpSequenceResultCode::NoSelfBump);
        }

        if let Some(range) = &self.range {
            if !range.is_well_formed() {
                return Err(BumpSequenceResultCode::InvalidRange);
            }
        }

        Ok(())
    }

    fn apply(
        &self,
        scope: &OperationScope<'_>,
        delta: &mut LedgerDelta,
    ) -> Result<std::result::Result<(), Self::Code>> {
        let mut account = delta.load_account(scope.source_id)?.ok_or_else(|| {
            Error::AccountNotFound(format!("bump target {} vanished", scope.source_id))
        })?;

        // Earlier operations in the transaction may have moved it since validation
        if let Some(range) = &self.range {
            if !account.seq_num_within(range.min, range.max) {
                return Ok(Err(BumpSequenceResultCode::OutOfRange));
            }
        }

        let current = account.seq_num();

        account.set_seq_num(self.bump_to.max(current))?;
        delta.store_change(account)?;

        Ok(Ok(()))
    }
}
