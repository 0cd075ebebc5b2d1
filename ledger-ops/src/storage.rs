//! Account state storage
//!
//! # Column Families
//!
//! - `accounts` - Account entries (key: account ID bytes)
//! - `meta` - Ledger header (key: `header`)
//!
//! Writes only ever happen through [`AccountStore::commit`], which the change log
//! calls once per successful transaction. A RocksDB `WriteBatch` makes each commit
//! all-or-nothing.

use crate::{
    account::AccountEntry,
    error::{Error, Result},
    types::{AccountId, LedgerHeader},
    Config,
};
use parking_lot::RwLock;
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_META: &str = "meta";

const HEADER_KEY: &[u8] = b"header";

/// Persistent account state consumed by the change log
pub trait AccountStore: Send + Sync {
    /// Load an account, `None` if it does not exist
    fn load_account(&self, account_id: &AccountId) -> Result<Option<AccountEntry>>;

    /// Load the last committed ledger header
    fn load_header(&self) -> Result<Option<LedgerHeader>>;

    /// Atomically persist a header together with the mutated accounts
    fn commit(&self, header: &LedgerHeader, accounts: &[AccountEntry]) -> Result<()>;
}

/// RocksDB-backed account store
pub struct Storage {
    db: DB,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.db.path())
            .finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_accounts()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened account store");

        Ok(Self { db })
    }

    fn cf_options_accounts() -> Options {
        let mut opts = Options::default();
        // Accounts are read on every operation, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }
}

impl AccountStore for Storage {
    fn load_account(&self, account_id: &AccountId) -> Result<Option<AccountEntry>> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        match self.db.get_cf(&cf, account_id.as_str().as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn load_header(&self) -> Result<Option<LedgerHeader>> {
        let cf = self.cf_handle(CF_META)?;
        match self.db.get_cf(&cf, HEADER_KEY)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn commit(&self, header: &LedgerHeader, accounts: &[AccountEntry]) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        for account in accounts {
            let value = bincode::serialize(account)?;
            batch.put_cf(&cf_accounts, account.account_id.as_str().as_bytes(), &value);
        }

        let cf_meta = self.cf_handle(CF_META)?;
        batch.put_cf(&cf_meta, HEADER_KEY, &bincode::serialize(header)?);

        self.db.write(batch)?;

        tracing::debug!(
            ledger_seq = header.ledger_seq,
            accounts = accounts.len(),
            "Committed ledger changes"
        );

        Ok(())
    }
}

/// In-memory account store
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    header: Option<LedgerHeader>,
    accounts: BTreeMap<AccountId, AccountEntry>,
}

impl MemoryStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub fn account_count(&self) -> usize {
        self.inner.read().accounts.len()
    }
}

impl AccountStore for MemoryStore {
    fn load_account(&self, account_id: &AccountId) -> Result<Option<AccountEntry>> {
        Ok(self.inner.read().accounts.get(account_id).cloned())
    }

    fn load_header(&self) -> Result<Option<LedgerHeader>> {
        Ok(self.inner.read().header)
    }

    fn commit(&self, header: &LedgerHeader, accounts: &[AccountEntry]) -> Result<()> {
        let mut state = self.inner.write();
        for account in accounts {
            state
                .accounts
                .insert(account.account_id.clone(), account.clone());
        }
        state.header = Some(*header);
        Ok(())
    }
}
