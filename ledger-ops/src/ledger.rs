//! Main ledger orchestration layer
//!
//! This module ties together storage, the change log and the transaction driver
//! into a high-level API. One `Ledger` is the single writer of its store:
//! transactions are applied strictly one after another, each against a fresh
//! [`LedgerDelta`] that is committed only when the transaction succeeds.
//!
//! # Example
//!
//! ```no_run
//! use ledger_ops::{Config, Ledger};
//!
//! fn main() -> ledger_ops::Result<()> {
//!     let config = Config::default();
//!     let mut ledger = Ledger::open(config)?;
//!
//!     // let result = ledger.apply_transaction(&tx)?;
//!
//!     ledger.close_ledger()?;
//!     Ok(())
//! }
//! ```

use crate::{
    account::AccountEntry,
    delta::LedgerDelta,
    metrics::{NoopObserver, OperationObserver},
    storage::{AccountStore, Storage},
    transaction::{apply_transaction, Transaction, TransactionResult},
    types::{AccountId, LedgerHeader, SequenceNumber},
    Config, Error, Result,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

/// Main ledger interface
pub struct Ledger {
    /// Account store
    store: Arc<dyn AccountStore>,

    /// Header of the ledger being built
    header: LedgerHeader,

    /// Outcome reporter
    observer: Arc<dyn OperationObserver>,

    /// Configuration
    config: Config,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("header", &self.header)
            .field("service", &self.config.service_name)
            .finish()
    }
}

impl Ledger {
    /// Open RocksDB-backed ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Storage::open(&config)?;
        Self::with_store(Arc::new(storage), config)
    }

    /// Run the ledger on top of any account store
    pub fn with_store(store: Arc<dyn AccountStore>, config: Config) -> Result<Self> {
        let header = match store.load_header()? {
            Some(stored) => LedgerHeader::new(stored.ledger_seq, config.protocol.ledger_version),
            None => LedgerHeader::new(
                config.protocol.initial_ledger_seq,
                config.protocol.ledger_version,
            ),
        };

        info!(
            ledger_seq = header.ledger_seq,
            ledger_version = header.ledger_version,
            "Ledger opened"
        );

        Ok(Self {
            store,
            header,
            observer: Arc::new(NoopObserver),
            config,
        })
    }

    /// Report outcomes to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn OperationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Header of the ledger being built
    pub fn header(&self) -> LedgerHeader {
        self.header
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load a committed account
    pub fn account(&self, account_id: &AccountId) -> Result<Option<AccountEntry>> {
        self.store.load_account(account_id)
    }

    /// Committed sequence number of an account
    pub fn sequence_number(&self, account_id: &AccountId) -> Result<SequenceNumber> {
        self.account(account_id)?
            .map(|entry| entry.seq_num())
            .ok_or_else(|| Error::AccountNotFound(account_id.to_string()))
    }

    /// Fund a new account. Its sequence number starts at `ledger_seq << 32`.
    pub fn create_account(
        &mut self,
        account_id: AccountId,
        balance: Decimal,
    ) -> Result<AccountEntry> {
        let entry = AccountEntry::new(
            account_id,
            balance,
            SequenceNumber::starting(self.header.ledger_seq),
        );

        let mut delta = self.new_delta();
        delta.create_account(entry.clone())?;
        let written = delta.commit()?;
        self.observer.record_commit(written);

        info!(account = %entry.account_id, seq_num = %entry.seq_num(), "Account created");
        Ok(entry)
    }

    /// Apply one transaction, committing its changes only if it succeeds
    pub fn apply_transaction(&mut self, tx: &Transaction) -> Result<TransactionResult> {
        let mut delta = self.new_delta();
        let result = apply_transaction(tx, &mut delta, self.observer.as_ref())?;

        if result.is_success() {
            let written = delta.commit()?;
            self.observer.record_commit(written);
        }

        Ok(result)
    }

    /// Apply transactions in the given order
    pub fn apply_transactions(&mut self, txs: &[Transaction]) -> Result<Vec<TransactionResult>> {
        txs.iter().map(|tx| self.apply_transaction(tx)).collect()
    }

    /// Finish the current ledger and start the next one
    pub fn close_ledger(&mut self) -> Result<LedgerHeader> {
        let closed = self.header;
        let next_seq = closed
            .ledger_seq
            .checked_add(1)
            .ok_or_else(|| Error::InvariantViolation("ledger sequence overflow".to_string()))?;

        let next = LedgerHeader::new(next_seq, closed.ledger_version);
        self.store.commit(&next, &[])?;
        self.header = next;

        info!(closed = closed.ledger_seq, next = next.ledger_seq, "Ledger closed");
        Ok(closed)
    }

    fn new_delta(&self) -> LedgerDelta {
        LedgerDelta::new(self.header, self.store.clone())
    }
}
