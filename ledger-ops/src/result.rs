//! Operation result codes
//!
//! Every execution attempt of an operation ends with exactly one of these codes.
//! Validation failures and apply failures share the same per-kind enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Behaviour shared by per-kind result code enums
pub trait ResultCode: Copy + fmt::Debug + Into<InnerResult> {
    /// The success code of this kind
    const SUCCESS: Self;

    /// Whether this code is the success code
    fn is_success(&self) -> bool;

    /// Stable kebab-case label (used for metrics and logs)
    fn label(&self) -> &'static str;
}

/// Result codes of the bump-sequence operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum BumpSequenceResultCode {
    /// Sequence number bumped (including the no-op case)
    Success = 0,
    /// Protocol version predates the operation
    NotSupportedYet = -1,
    /// Target is the transaction's own source account
    NoSelfBump = -2,
    /// Range precondition has `max < min`
    InvalidRange = -3,
    /// Current sequence number outside the range precondition
    OutOfRange = -4,
}

impl ResultCode for BumpSequenceResultCode {
    const SUCCESS: Self = BumpSequenceResultCode::Success;

    fn is_success(&self) -> bool {
        matches!(self, BumpSequenceResultCode::Success)
    }

    fn label(&self) -> &'static str {
        match self {
            BumpSequenceResultCode::Success => "success",
            BumpSequenceResultCode::NotSupportedYet => "not-supported-yet",
            BumpSequenceResultCode::NoSelfBump => "no-self-bump",
            BumpSequenceResultCode::InvalidRange => "invalid-range",
            BumpSequenceResultCode::OutOfRange => "out-of-range",
        }
    }
}

impl fmt::Display for BumpSequenceResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Kind-specific result, tagged by operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InnerResult {
    /// Result of a bump-sequence operation
    BumpSequence(BumpSequenceResultCode),
}

impl InnerResult {
    /// Whether the inner code is a success
    pub fn is_success(&self) -> bool {
        match self {
            InnerResult::BumpSequence(code) => code.is_success(),
        }
    }

    /// Label of the inner code
    pub fn label(&self) -> &'static str {
        match self {
            InnerResult::BumpSequence(code) => code.label(),
        }
    }
}

impl From<BumpSequenceResultCode> for InnerResult {
    fn from(code: BumpSequenceResultCode) -> Self {
        InnerResult::BumpSequence(code)
    }
}

/// Outcome of one operation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationResult {
    /// The operation ran; see the kind-specific code
    Inner(InnerResult),
    /// The operation's source account does not exist
    NoAccount,
}

impl OperationResult {
    /// Whether the operation succeeded
    pub fn is_success(&self) -> bool {
        match self {
            OperationResult::Inner(inner) => inner.is_success(),
            OperationResult::NoAccount => false,
        }
    }

    /// Stable label
    pub fn label(&self) -> &'static str {
        match self {
            OperationResult::Inner(inner) => inner.label(),
            OperationResult::NoAccount => "no-account",
        }
    }

    /// Bump-sequence code, if this is a bump-sequence result
    pub fn bump_sequence_code(&self) -> Option<BumpSequenceResultCode> {
        match self {
            OperationResult::Inner(InnerResult::BumpSequence(code)) => Some(*code),
            OperationResult::NoAccount => None,
        }
    }
}

impl From<InnerResult> for OperationResult {
    fn from(inner: InnerResult) -> Self {
        OperationResult::Inner(inner)
    }
}

impl From<BumpSequenceResultCode> for OperationResult {
    fn from(code: BumpSequenceResultCode) -> Self {
        OperationResult::Inner(code.into())
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
