//! Ledger change log
//!
//! A [`LedgerDelta`] is the only write path into account state. It reads through to
//! the underlying [`AccountStore`], keeps every mutation in memory in the order it
//! happened, and either commits all of them at once or is dropped.
//!
//! Checkpoints let an orchestrator discard the tail of the log, which is how a
//! failed operation (or a failed transaction) is rolled back without touching the
//! store.

use crate::{
    account::AccountEntry,
    storage::AccountStore,
    types::{AccountId, LedgerHeader, SequenceNumber},
    Error, Result,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One recorded mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerChange {
    /// Entry before the change, `None` if the change created it
    pub previous: Option<AccountEntry>,
    /// Entry after the change
    pub current: AccountEntry,
}

impl LedgerChange {
    /// Account touched by this change
    pub fn account_id(&self) -> &AccountId {
        &self.current.account_id
    }
}

/// Position in the change log that can be rolled back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

#[derive(Debug)]
struct Recorded {
    change: LedgerChange,
    // Value held in `live` before this change, restored on rollback
    shadowed: Option<AccountEntry>,
}

/// Pending mutations on top of an account store
pub struct LedgerDelta {
    header: LedgerHeader,
    store: Arc<dyn AccountStore>,
    live: BTreeMap<AccountId, AccountEntry>,
    log: Vec<Recorded>,
}

impl std::fmt::Debug for LedgerDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerDelta")
            .field("header", &self.header)
            .field("changes", &self.log.len())
            .finish()
    }
}

impl LedgerDelta {
    /// Start an empty change log for the ledger described by `header`
    pub fn new(header: LedgerHeader, store: Arc<dyn AccountStore>) -> Self {
        Self {
            header,
            store,
            live: BTreeMap::new(),
            log: Vec::new(),
        }
    }

    /// Header of the ledger being built
    pub fn header(&self) -> &LedgerHeader {
        &self.header
    }

    /// Load an account as seen by this delta
    pub fn load_account(&self, account_id: &AccountId) -> Result<Option<AccountEntry>> {
        if let Some(entry) = self.live.get(account_id) {
            return Ok(Some(entry.clone()));
        }
        self.store.load_account(account_id)
    }

    /// Whether the account exists as seen by this delta
    pub fn account_exists(&self, account_id: &AccountId) -> Result<bool> {
        Ok(self.load_account(account_id)?.is_some())
    }

    /// Current sequence number of an existing account
    pub fn sequence_number(&self, account_id: &AccountId) -> Result<SequenceNumber> {
        self.load_account(account_id)?
            .map(|entry| entry.seq_num())
            .ok_or_else(|| Error::AccountNotFound(account_id.to_string()))
    }

    /// Record a newly created account
    pub fn create_account(&mut self, entry: AccountEntry) -> Result<()> {
        if self.account_exists(&entry.account_id)? {
            return Err(Error::AccountExists(entry.account_id.to_string()));
        }
        self.record(None, entry);
        Ok(())
    }

    /// Record a modification of an existing account
    pub fn store_change(&mut self, entry: AccountEntry) -> Result<()> {
        let previous = self
            .load_account(&entry.account_id)?
            .ok_or_else(|| Error::AccountNotFound(entry.account_id.to_string()))?;

        if entry.seq_num() < previous.seq_num() {
            return Err(Error::InvariantViolation(format!(
                "change would lower sequence number of {} from {} to {}",
                entry.account_id,
                previous.seq_num(),
                entry.seq_num()
            )));
        }

        self.record(Some(previous), entry);
        Ok(())
    }

    /// Set the sequence number of an existing account
    pub fn set_sequence_number(
        &mut self,
        account_id: &AccountId,
        seq_num: SequenceNumber,
    ) -> Result<()> {
        let mut entry = self
            .load_account(account_id)?
            .ok_or_else(|| Error::AccountNotFound(account_id.to_string()))?;
        entry.set_seq_num(seq_num)?;
        self.store_change(entry)
    }

    fn record(&mut self, previous: Option<AccountEntry>, current: AccountEntry) {
        let shadowed = self
            .live
            .insert(current.account_id.clone(), current.clone());
        self.log.push(Recorded {
            change: LedgerChange { previous, current },
            shadowed,
        });
    }

    /// Mark the current end of the log
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.log.len())
    }

    /// Undo every change recorded after `checkpoint`
    pub fn rollback_to(&mut self, checkpoint: Checkpoint) {
        while self.log.len() > checkpoint.0 {
            let Some(recorded) = self.log.pop() else {
                break;
            };
            let account_id = recorded.change.current.account_id;
            match recorded.shadowed {
                Some(entry) => {
                    self.live.insert(account_id, entry);
                }
                None => {
                    self.live.remove(&account_id);
                }
            }
        }
    }

    /// Recorded changes, oldest first
    pub fn changes(&self) -> impl Iterator<Item = &LedgerChange> + '_ {
        self.log.iter().map(|recorded| &recorded.change)
    }

    /// Number of recorded changes
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Persist the final state of every touched account in one atomic write.
    ///
    /// Returns the number of accounts written.
    pub fn commit(self) -> Result<usize> {
        let accounts: Vec<AccountEntry> = self.live.into_values().collect();
        self.store.commit(&self.header, &accounts)?;

        tracing::debug!(
            ledger_seq = self.header.ledger_seq,
            changes = self.log.len(),
            accounts = accounts.len(),
            "Ledger delta committed"
        );

        Ok(accounts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rust_decimal::Decimal;

    fn account(id: &str, seq: u64) -> AccountEntry {
        AccountEntry::new(AccountId::new(id), Decimal::new(50, 0), SequenceNumber::new(seq))
    }

    fn delta_with(accounts: &[AccountEntry]) -> (Arc<MemoryStore>, LedgerDelta) {
        let store = Arc::new(MemoryStore::new());
        let header = LedgerHeader::new(1, 10);
        store.commit(&header, accounts).unwrap();
        let delta = LedgerDelta::new(header, store.clone());
        (store, delta)
    }

    #[test]
    fn test_reads_through_to_store() {
        let (_store, delta) = delta_with(&[account("GA", 7)]);
        assert!(delta.account_exists(&AccountId::new("GA")).unwrap());
        assert!(!delta.account_exists(&AccountId::new("GB")).unwrap());
        assert_eq!(
            delta.sequence_number(&AccountId::new("GA")).unwrap().value(),
            7
        );
        assert!(matches!(
            delta.sequence_number(&AccountId::new("GB")),
            Err(Error::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_changes_visible_before_commit_only_in_delta() {
        let (store, mut delta) = delta_with(&[account("GA", 7)]);
        let id = AccountId::new("GA");

        delta.set_sequence_number(&id, SequenceNumber::new(9)).unwrap();

        assert_eq!(delta.sequence_number(&id).unwrap().value(), 9);
        assert_eq!(store.load_account(&id).unwrap().unwrap().seq_num().value(), 7);

        let change = delta.changes().next().unwrap();
        assert_eq!(change.previous.as_ref().unwrap().seq_num().value(), 7);
        assert_eq!(change.current.seq_num().value(), 9);

        assert_eq!(delta.commit().unwrap(), 1);
        assert_eq!(store.load_account(&id).unwrap().unwrap().seq_num().value(), 9);
    }

    #[test]
    fn test_rollback_to_checkpoint() {
        let (store, mut delta) = delta_with(&[account("GA", 1)]);
        let id = AccountId::new("GA");

        delta.set_sequence_number(&id, SequenceNumber::new(2)).unwrap();
        let checkpoint = delta.checkpoint();
        delta.set_sequence_number(&id, SequenceNumber::new(3)).unwrap();
        delta.create_account(account("GB", 0)).unwrap();

        delta.rollback_to(checkpoint);

        assert_eq!(delta.len(), 1);
        assert_eq!(delta.sequence_number(&id).unwrap().value(), 2);
        assert!(!delta.account_exists(&AccountId::new("GB")).unwrap());

        delta.commit().unwrap();
        assert!(store.load_account(&AccountId::new("GB")).unwrap().is_none());
        assert_eq!(store.load_account(&id).unwrap().unwrap().seq_num().value(), 2);
    }

    #[test]
    fn test_rejects_sequence_regression() {
        let (_store, mut delta) = delta_with(&[account("GA", 10)]);
        let err = delta
            .set_sequence_number(&AccountId::new("GA"), SequenceNumber::new(3))
            .unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert!(delta.is_empty());
    }

    #[test]
    fn test_create_existing_account_fails() {
        let (_store, mut delta) = delta_with(&[account("GA", 0)]);
        assert!(matches!(
            delta.create_account(account("GA", 0)),
            Err(Error::AccountExists(_))
        ));
    }
}
