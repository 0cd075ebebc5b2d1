//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Total ordering where the ledger relies on it (sequence numbers)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account identifier, derived from the account's Ed25519 public key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Prefix marking an account identifier in its string form
    pub const PREFIX: char = 'G';

    /// Create new account ID from its string form
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive account ID from a raw Ed25519 public key
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        Self(format!("{}{}", Self::PREFIX, hex::encode_upper(public_key)))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the public key, if this ID was derived from one
    pub fn public_key(&self) -> Option<[u8; 32]> {
        let encoded = self.0.strip_prefix(Self::PREFIX)?;
        let mut key = [0u8; 32];
        hex::decode_to_slice(encoded, &mut key).ok()?;
        Some(key)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-account transaction sequence number
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    /// Create from raw value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw value
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Starting sequence number for an account created in `ledger_seq`.
    ///
    /// The ledger number occupies the high 32 bits so accounts re-created after a
    /// merge can never replay transactions signed for an earlier incarnation.
    pub const fn starting(ledger_seq: u32) -> Self {
        Self((ledger_seq as u64) << 32)
    }

    /// The next sequence number, `None` on overflow
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl From<u64> for SequenceNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger header fields visible to operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHeader {
    /// Number of the ledger currently being built
    pub ledger_seq: u32,

    /// Active protocol version
    pub ledger_version: u32,
}

impl LedgerHeader {
    /// Create new header
    pub fn new(ledger_seq: u32, ledger_version: u32) -> Self {
        Self {
            ledger_seq,
            ledger_version,
        }
    }

    /// Current protocol version
    pub fn current_ledger_version(&self) -> u32 {
        self.ledger_version
    }
}

/// Signature-weight category an operation requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ThresholdLevel {
    /// Low threshold
    Low,
    /// Medium threshold
    Medium,
    /// High threshold
    High,
}

impl ThresholdLevel {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdLevel::Low => "low",
            ThresholdLevel::Medium => "medium",
            ThresholdLevel::High => "high",
        }
    }
}

impl fmt::Display for ThresholdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
