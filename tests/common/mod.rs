use povy::application::coordinator::{NewAccount, PaymentCoordinator, PaymentRequest};
use povy::domain::account::{Account, Currency};
use povy::domain::ports::{AccountStoreHandle, LedgerStoreHandle};
use povy::infrastructure::in_memory::{InMemoryAccountStore, InMemoryLedgerStore};
use rust_decimal::Decimal;
use std::sync::Arc;

pub fn coordinator() -> PaymentCoordinator {
    let accounts: AccountStoreHandle = Arc::new(InMemoryAccountStore::new());
    let ledger: LedgerStoreHandle = Arc::new(InMemoryLedgerStore::new());
    PaymentCoordinator::new(accounts, ledger)
}

pub async fn open_account(
    coordinator: &PaymentCoordinator,
    number: &str,
    balance: Decimal,
) -> Account {
    coordinator
        .open_account(NewAccount {
            owner_name: "Test Owner".to_string(),
            currency: Currency::Usd,
            opening_balance: balance,
            account_number: Some(number.to_string()),
            card: None,
        })
        .await
        .expect("failed to open account")
}

pub fn request(amount: Decimal) -> PaymentRequest {
    PaymentRequest {
        amount,
        currency: None,
        description: None,
        merchant_name: None,
    }
}
