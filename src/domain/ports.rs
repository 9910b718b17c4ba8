use super::account::{Account, Currency};
use super::ledger::LedgerEntry;
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Outcome of a conditional balance write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceSwap {
    /// The stored balance matched the expected value and was replaced.
    Applied,
    /// The stored balance changed since it was read; re-read and retry.
    Conflict,
    /// No account with that number exists.
    Missing,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts a new account. Fails with `Conflict` if the number is taken.
    async fn insert(&self, account: Account) -> Result<()>;

    async fn find_by_number(&self, account_number: &str) -> Result<Option<Account>>;

    /// Resolves an account by the exact card number it holds.
    async fn find_by_card(&self, card_number: &str) -> Result<Option<Account>>;

    /// Atomically replaces the balance only if it still equals `expected`.
    ///
    /// This is the single write path for balance mutations; an unconditional
    /// read-modify-write would lose concurrent updates.
    async fn compare_and_swap_balance(
        &self,
        account_number: &str,
        expected: Decimal,
        new_balance: Decimal,
    ) -> Result<BalanceSwap>;

    /// Returns false if the account does not exist.
    async fn set_currency(&self, account_number: &str, currency: Currency) -> Result<bool>;

    /// Removes the account record. Ledger history referencing the number is
    /// left in place. Returns false if the account did not exist.
    async fn delete(&self, account_number: &str) -> Result<bool>;

    /// All accounts, most recently created first.
    async fn list_recent(&self) -> Result<Vec<Account>>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append-only insert. Stored entries are never updated or deleted.
    async fn append(&self, entry: LedgerEntry) -> Result<()>;

    /// Entries for one account, newest first, at most `limit` of them.
    async fn recent_for_account(
        &self,
        account_number: &str,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>>;
}

pub type AccountStoreHandle = Arc<dyn AccountStore>;
pub type LedgerStoreHandle = Arc<dyn LedgerStore>;
