use crate::domain::account::{Account, Currency};
use crate::domain::ledger::LedgerEntry;
use crate::domain::ports::{AccountStore, BalanceSwap, LedgerStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Column Family for account records, keyed by account number.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for ledger entries, keyed by account number + timestamp.
pub const CF_LEDGER: &str = "ledger";

/// A persistent store implementation using RocksDB.
///
/// Accounts and ledger entries live in separate Column Families with
/// `serde_json` values. Ledger keys embed a zero-padded nanosecond timestamp
/// plus a process-local sequence so a forward prefix scan yields entries in
/// creation order.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`);
/// conditional writes serialize on an internal mutex since RocksDB has no
/// native compare-and-swap.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
    sequence: Arc<AtomicU64>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// both column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_accounts = ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default());
        let cf_ledger = ColumnFamilyDescriptor::new(CF_LEDGER, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_accounts, cf_ledger])
            .map_err(|e| PaymentError::Persistence(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
            sequence: Arc::new(AtomicU64::new(0)),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::Persistence(format!("column family {name} not found")))
    }

    fn write_guard(&self) -> std::sync::MutexGuard<'_, ()> {
        // A poisoned lock only means another writer panicked; the guard is
        // still usable.
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn get_account(&self, account_number: &str) -> Result<Option<Account>> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let bytes = self
            .db
            .get_cf(&cf, account_number.as_bytes())
            .map_err(|e| PaymentError::Persistence(e.to_string()))?;
        match bytes {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_account(&self, account: &Account) -> Result<()> {
        let cf = self.cf(CF_ACCOUNTS)?;
        self.db
            .put_cf(&cf, account.account_number.as_bytes(), encode(account)?)
            .map_err(|e| PaymentError::Persistence(e.to_string()))
    }

    fn ledger_key(&self, entry: &LedgerEntry) -> Vec<u8> {
        let nanos = entry.created_at.timestamp_nanos_opt().unwrap_or(0);
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut key = Vec::with_capacity(entry.account_number.len() + 28);
        key.extend_from_slice(entry.account_number.as_bytes());
        key.push(0);
        key.extend_from_slice(format!("{nanos:020}{sequence:06}").as_bytes());
        key
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| PaymentError::Persistence(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| PaymentError::Persistence(e.to_string()))
}

#[async_trait]
impl AccountStore for RocksDbStore {
    async fn insert(&self, account: Account) -> Result<()> {
        let _guard = self.write_guard();
        if self.get_account(&account.account_number)?.is_some() {
            return Err(PaymentError::Conflict(format!(
                "account {} already exists",
                account.account_number
            )));
        }
        self.put_account(&account)
    }

    async fn find_by_number(&self, account_number: &str) -> Result<Option<Account>> {
        self.get_account(account_number)
    }

    async fn find_by_card(&self, card_number: &str) -> Result<Option<Account>> {
        let cf = self.cf(CF_ACCOUNTS)?;
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item.map_err(|e| PaymentError::Persistence(e.to_string()))?;
            let account: Account = decode(&value)?;
            if account.card.number == card_number {
                return Ok(Some(account));
            }
        }
        Ok(None)
    }

    async fn compare_and_swap_balance(
        &self,
        account_number: &str,
        expected: Decimal,
        new_balance: Decimal,
    ) -> Result<BalanceSwap> {
        let _guard = self.write_guard();
        match self.get_account(account_number)? {
            None => Ok(BalanceSwap::Missing),
            Some(account) if account.balance != expected => Ok(BalanceSwap::Conflict),
            Some(mut account) => {
                account.balance = new_balance;
                self.put_account(&account)?;
                Ok(BalanceSwap::Applied)
            }
        }
    }

    async fn set_currency(&self, account_number: &str, currency: Currency) -> Result<bool> {
        let _guard = self.write_guard();
        match self.get_account(account_number)? {
            None => Ok(false),
            Some(mut account) => {
                account.currency = currency;
                self.put_account(&account)?;
                Ok(true)
            }
        }
    }

    async fn delete(&self, account_number: &str) -> Result<bool> {
        let _guard = self.write_guard();
        if self.get_account(account_number)?.is_none() {
            return Ok(false);
        }
        let cf = self.cf(CF_ACCOUNTS)?;
        self.db
            .delete_cf(&cf, account_number.as_bytes())
            .map_err(|e| PaymentError::Persistence(e.to_string()))?;
        Ok(true)
    }

    async fn list_recent(&self) -> Result<Vec<Account>> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item.map_err(|e| PaymentError::Persistence(e.to_string()))?;
            accounts.push(decode::<Account>(&value)?);
        }
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts)
    }
}

#[async_trait]
impl LedgerStore for RocksDbStore {
    async fn append(&self, entry: LedgerEntry) -> Result<()> {
        let cf = self.cf(CF_LEDGER)?;
        let key = self.ledger_key(&entry);
        self.db
            .put_cf(&cf, key, encode(&entry)?)
            .map_err(|e| PaymentError::Persistence(e.to_string()))
    }

    async fn recent_for_account(
        &self,
        account_number: &str,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let cf = self.cf(CF_LEDGER)?;
        let mut prefix = account_number.as_bytes().to_vec();
        prefix.push(0);

        let mode = rocksdb::IteratorMode::From(&prefix, rocksdb::Direction::Forward);
        let mut entries = Vec::new();
        for item in self.db.iterator_cf(cf, mode) {
            let (key, value) = item.map_err(|e| PaymentError::Persistence(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            entries.push(decode::<LedgerEntry>(&value)?);
        }
        // Keys scan oldest first; flip to newest first before capping.
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }
}
