use crate::domain::account::{Account, Currency};
use crate::domain::ledger::LedgerEntry;
use crate::domain::ports::{AccountStore, BalanceSwap, LedgerStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for accounts.
///
/// `compare_and_swap_balance` takes the write lock for the whole
/// read-compare-write step, which is what makes the swap atomic with respect
/// to concurrent attempts on the same account.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn insert(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.account_number) {
            return Err(PaymentError::Conflict(format!(
                "account {} already exists",
                account.account_number
            )));
        }
        accounts.insert(account.account_number.clone(), account);
        Ok(())
    }

    async fn find_by_number(&self, account_number: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(account_number).cloned())
    }

    async fn find_by_card(&self, card_number: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|account| account.card.number == card_number)
            .cloned())
    }

    async fn compare_and_swap_balance(
        &self,
        account_number: &str,
        expected: Decimal,
        new_balance: Decimal,
    ) -> Result<BalanceSwap> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(account_number) {
            None => Ok(BalanceSwap::Missing),
            Some(account) if account.balance != expected => Ok(BalanceSwap::Conflict),
            Some(account) => {
                account.balance = new_balance;
                Ok(BalanceSwap::Applied)
            }
        }
    }

    async fn set_currency(&self, account_number: &str, currency: Currency) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(account_number) {
            None => Ok(false),
            Some(account) => {
                account.currency = currency;
                Ok(true)
            }
        }
    }

    async fn delete(&self, account_number: &str) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.remove(account_number).is_some())
    }

    async fn list_recent(&self) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut all: Vec<Account> = accounts.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

/// A thread-safe in-memory, append-only ledger.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn append(&self, entry: LedgerEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }

    async fn recent_for_account(
        &self,
        account_number: &str,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        let mut matching: Vec<(usize, LedgerEntry)> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.account_number == account_number)
            .map(|(index, entry)| (index, entry.clone()))
            .collect();
        // created_at is the ordering key; insertion order breaks timestamp
        // ties so same-instant entries still come back newest first.
        matching.sort_by(|(ai, a), (bi, b)| {
            b.created_at.cmp(&a.created_at).then(bi.cmp(ai))
        });
        matching.truncate(limit);
        Ok(matching.into_iter().map(|(_, entry)| entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Card;
    use crate::domain::ledger::{EntrySource, EntryType};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn account(number: &str, balance: Decimal) -> Account {
        Account {
            account_number: number.to_string(),
            owner_name: "Test Owner".to_string(),
            balance,
            currency: Currency::Usd,
            card: Card {
                number: format!("4{number}00000"),
                exp_month: "01".to_string(),
                exp_year: "2030".to_string(),
                cvv: "123".to_string(),
            },
            created_at: Utc::now(),
        }
    }

    fn entry(number: &str, amount: Decimal) -> LedgerEntry {
        LedgerEntry {
            account_number: number.to_string(),
            entry_type: EntryType::Debit,
            amount,
            currency: Currency::Usd,
            description: "test".to_string(),
            source: EntrySource::AccountPayment,
            transaction_id: None,
            balance_after: Decimal::ZERO,
            merchant_name: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = InMemoryAccountStore::new();
        store.insert(account("1111111111", dec!(100))).await.unwrap();

        let found = store.find_by_number("1111111111").await.unwrap().unwrap();
        assert_eq!(found.balance, dec!(100));
        assert!(store.find_by_number("2222222222").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_conflict() {
        let store = InMemoryAccountStore::new();
        store.insert(account("1111111111", dec!(100))).await.unwrap();
        let err = store
            .insert(account("1111111111", dec!(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_find_by_card() {
        let store = InMemoryAccountStore::new();
        let acc = account("1111111111", dec!(100));
        let card_number = acc.card.number.clone();
        store.insert(acc).await.unwrap();

        let found = store.find_by_card(&card_number).await.unwrap().unwrap();
        assert_eq!(found.account_number, "1111111111");
        assert!(store.find_by_card("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cas_applies_only_on_expected_balance() {
        let store = InMemoryAccountStore::new();
        store.insert(account("1111111111", dec!(100))).await.unwrap();

        let swap = store
            .compare_and_swap_balance("1111111111", dec!(100), dec!(60))
            .await
            .unwrap();
        assert_eq!(swap, BalanceSwap::Applied);

        // Stale expectation loses.
        let swap = store
            .compare_and_swap_balance("1111111111", dec!(100), dec!(20))
            .await
            .unwrap();
        assert_eq!(swap, BalanceSwap::Conflict);
        assert_eq!(
            store
                .find_by_number("1111111111")
                .await
                .unwrap()
                .unwrap()
                .balance,
            dec!(60)
        );

        let swap = store
            .compare_and_swap_balance("9999999999", dec!(0), dec!(1))
            .await
            .unwrap();
        assert_eq!(swap, BalanceSwap::Missing);
    }

    #[tokio::test]
    async fn test_delete_and_list_recent() {
        let store = InMemoryAccountStore::new();
        let mut first = account("1111111111", dec!(1));
        first.created_at = Utc::now() - chrono::Duration::seconds(10);
        store.insert(first).await.unwrap();
        store.insert(account("2222222222", dec!(2))).await.unwrap();

        let listed = store.list_recent().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].account_number, "2222222222");

        assert!(store.delete("1111111111").await.unwrap());
        assert!(!store.delete("1111111111").await.unwrap());
        assert_eq!(store.list_recent().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ledger_newest_first_and_capped() {
        let store = InMemoryLedgerStore::new();
        for i in 1..=60 {
            store.append(entry("1111111111", Decimal::from(i))).await.unwrap();
        }
        store.append(entry("2222222222", dec!(999))).await.unwrap();

        let recent = store.recent_for_account("1111111111", 50).await.unwrap();
        assert_eq!(recent.len(), 50);
        assert_eq!(recent[0].amount, dec!(60));
        assert_eq!(recent[49].amount, dec!(11));
        assert!(recent.iter().all(|e| e.account_number == "1111111111"));
    }
}
