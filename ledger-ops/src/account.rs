//! Account entries and their sequence-number rules

use crate::{
    types::{AccountId, SequenceNumber, ThresholdLevel},
    Error, Result,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Signature weights required per threshold level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Weight of the account's own key
    pub master_weight: u8,
    /// Weight needed for LOW operations
    pub low: u8,
    /// Weight needed for MEDIUM operations
    pub medium: u8,
    /// Weight needed for HIGH operations
    pub high: u8,
}

impl Thresholds {
    /// Weight needed to authorize an operation of the given level
    pub fn threshold(&self, level: ThresholdLevel) -> u8 {
        match level {
            ThresholdLevel::Low => self.low,
            ThresholdLevel::Medium => self.medium,
            ThresholdLevel::High => self.high,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            master_weight: 1,
            low: 0,
            medium: 0,
            high: 0,
        }
    }
}

/// Additional signer on an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    /// Signer key
    pub key: AccountId,
    /// Signer weight
    pub weight: u8,
}

/// Account state stored in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    /// Account identity
    pub account_id: AccountId,

    /// Native balance
    pub balance: Decimal,

    /// Last consumed sequence number
    seq_num: SequenceNumber,

    /// Signature thresholds
    pub thresholds: Thresholds,

    /// Additional signers
    pub signers: Vec<Signer>,
}

impl AccountEntry {
    /// Create new account entry
    pub fn new(account_id: AccountId, balance: Decimal, seq_num: SequenceNumber) -> Self {
        Self {
            account_id,
            balance,
            seq_num,
            thresholds: Thresholds::default(),
            signers: Vec::new(),
        }
    }

    /// Current sequence number
    pub fn seq_num(&self) -> SequenceNumber {
        self.seq_num
    }

    /// Sequence number the next transaction from this account must carry
    pub fn next_seq_num(&self) -> Option<SequenceNumber> {
        self.seq_num.next()
    }

    /// Advance the sequence number. Writing back the current value is allowed.
    pub fn set_seq_num(&mut self, seq_num: SequenceNumber) -> Result<()> {
        if seq_num < self.seq_num {
            return Err(Error::InvariantViolation(format!(
                "sequence number of {} would decrease from {} to {}",
                self.account_id, self.seq_num, seq_num
            )));
        }
        self.seq_num = seq_num;
        Ok(())
    }

    /// Whether `seq_num` is inside the inclusive window `[min, max]`
    pub fn seq_num_within(&self, min: SequenceNumber, max: SequenceNumber) -> bool {
        min <= self.seq_num && self.seq_num <= max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(seq: u64) -> AccountEntry {
        AccountEntry::new(AccountId::new("GA"), Decimal::new(100, 0), SequenceNumber::new(seq))
    }

    #[test]
    fn test_seq_num_never_decreases() {
        let mut account = entry(10);
        assert!(account.set_seq_num(SequenceNumber::new(9)).is_err());
        assert_eq!(account.seq_num().value(), 10);

        account.set_seq_num(SequenceNumber::new(10)).unwrap();
        account.set_seq_num(SequenceNumber::new(42)).unwrap();
        assert_eq!(account.seq_num().value(), 42);
    }

    #[test]
    fn test_seq_num_within_is_inclusive() {
        let account = entry(100);
        assert!(account.seq_num_within(SequenceNumber::new(100), SequenceNumber::new(100)));
        assert!(account.seq_num_within(SequenceNumber::new(90), SequenceNumber::new(120)));
        assert!(!account.seq_num_within(SequenceNumber::new(101), SequenceNumber::new(120)));
    }

    #[test]
    fn test_thresholds_by_level() {
        let thresholds = Thresholds {
            master_weight: 1,
            low: 1,
            medium: 2,
            high: 3,
        };
        assert_eq!(thresholds.threshold(ThresholdLevel::Low), 1);
        assert_eq!(thresholds.threshold(ThresholdLevel::Medium), 2);
        assert_eq!(thresholds.threshold(ThresholdLevel::High), 3);
    }
}
