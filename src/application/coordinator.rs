use super::provisioning;
use super::recorder::TransactionRecorder;
use crate::domain::account::{Account, Card, Currency};
use crate::domain::authorizer::{self, Outcome};
use crate::domain::ledger::{EntrySource, EntryType, LedgerEntry};
use crate::domain::ports::{AccountStoreHandle, BalanceSwap, LedgerStoreHandle};
use crate::error::{PaymentError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Maximum number of ledger entries returned per history query.
pub const HISTORY_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Approved,
    Declined,
}

/// Outcome of one payment attempt. A declined attempt is a successful
/// result, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResult {
    pub status: PaymentStatus,
    pub transaction_id: String,
    pub message: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    pub account_number: String,
    pub remaining_balance: Decimal,
    /// Present for card payments only; never the full card number.
    pub card_last4: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: Decimal,
    /// Falls back to the account's own currency when absent.
    pub currency: Option<Currency>,
    pub description: Option<String>,
    pub merchant_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CardDetails {
    pub number: String,
    pub exp_month: String,
    pub exp_year: String,
    pub cvv: String,
}

/// Input to [`PaymentCoordinator::adjust_balance`]. `balance` (absolute set)
/// and `add_balance` (signed delta) are mutually exclusive.
#[derive(Debug, Clone, Default)]
pub struct BalanceAdjustment {
    pub currency: Option<Currency>,
    pub balance: Option<Decimal>,
    pub add_balance: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub owner_name: String,
    pub currency: Currency,
    pub opening_balance: Decimal,
    /// Explicit number/card for scripted scenarios; generated when absent.
    pub account_number: Option<String>,
    pub card: Option<Card>,
}

/// Orchestrates one balance mutation end to end: read the account, decide,
/// write the new balance, and hand exactly one ledger entry to the recorder.
///
/// Concurrency discipline: every balance write is a compare-and-swap against
/// the balance that was read. A conflict means another attempt committed in
/// between; the loser re-reads and re-decides. Attempts on different
/// accounts never contend. Ledger recording happens after the balance effect
/// is final and is never awaited on the payment path.
pub struct PaymentCoordinator {
    accounts: AccountStoreHandle,
    ledger: LedgerStoreHandle,
    recorder: TransactionRecorder,
    sequence: AtomicU64,
}

impl PaymentCoordinator {
    pub fn new(accounts: AccountStoreHandle, ledger: LedgerStoreHandle) -> Self {
        let recorder = TransactionRecorder::new(ledger.clone());
        Self {
            accounts,
            ledger,
            recorder,
            sequence: AtomicU64::new(0),
        }
    }

    /// Debits an account resolved by its unique number.
    pub async fn pay_by_account(
        &self,
        account_number: &str,
        request: PaymentRequest,
    ) -> Result<PaymentResult> {
        let account = self
            .accounts
            .find_by_number(account_number)
            .await?
            .ok_or_else(|| {
                PaymentError::NotFound(format!("account {account_number} not found"))
            })?;
        validate_amount(request.amount)?;
        self.settle(account, request, EntrySource::AccountPayment, None)
            .await
    }

    /// Debits the account holding the given card.
    ///
    /// "No account holds that card number" and "card found but expiry/CVV do
    /// not match" are distinct failures; neither mutates anything or writes
    /// a ledger entry.
    pub async fn pay_by_card(
        &self,
        card: CardDetails,
        request: PaymentRequest,
    ) -> Result<PaymentResult> {
        let account = self
            .accounts
            .find_by_card(&card.number)
            .await?
            .ok_or_else(|| PaymentError::NotFound("no account holds that card".to_string()))?;
        if !account
            .card
            .matches(&card.exp_month, &card.exp_year, &card.cvv)
        {
            return Err(PaymentError::CardAuthentication(
                "card verification failed".to_string(),
            ));
        }
        validate_amount(request.amount)?;
        let last4 = account.card.last4().to_string();
        self.settle(account, request, EntrySource::CardPayment, Some(last4))
            .await
    }

    /// Read-decide-write under optimistic retry, then unconditional ledger
    /// recording. Approved and declined attempts both leave exactly one
    /// entry with `balance_after` equal to the post-call balance.
    async fn settle(
        &self,
        account: Account,
        request: PaymentRequest,
        source: EntrySource,
        card_last4: Option<String>,
    ) -> Result<PaymentResult> {
        let currency = request.currency.unwrap_or(account.currency);
        let transaction_id = self.next_transaction_id();

        let mut current = account;
        let (status, balance_after) = loop {
            let decision = authorizer::decide(current.balance, request.amount);
            match decision.outcome {
                Outcome::Declined => break (PaymentStatus::Declined, current.balance),
                Outcome::Approved => {
                    let swap = self
                        .accounts
                        .compare_and_swap_balance(
                            &current.account_number,
                            current.balance,
                            decision.new_balance,
                        )
                        .await?;
                    match swap {
                        BalanceSwap::Applied => {
                            break (PaymentStatus::Approved, decision.new_balance);
                        }
                        BalanceSwap::Conflict => {
                            debug!(
                                account_number = %current.account_number,
                                "balance changed under us; retrying with a fresh read"
                            );
                            current = self.reload(&current.account_number).await?;
                        }
                        BalanceSwap::Missing => {
                            return Err(PaymentError::NotFound(format!(
                                "account {} not found",
                                current.account_number
                            )));
                        }
                    }
                }
            }
        };

        info!(
            account_number = %current.account_number,
            transaction_id = %transaction_id,
            amount = %request.amount,
            status = ?status,
            "payment settled"
        );

        self.recorder.record(LedgerEntry {
            account_number: current.account_number.clone(),
            entry_type: EntryType::Debit,
            amount: request.amount,
            currency,
            description: request
                .description
                .clone()
                .unwrap_or_else(|| "Simulated payment".to_string()),
            source,
            transaction_id: Some(transaction_id.clone()),
            balance_after,
            merchant_name: request.merchant_name.clone(),
            created_at: Utc::now(),
        });

        let message = match status {
            PaymentStatus::Approved => "Payment approved".to_string(),
            PaymentStatus::Declined => "Payment declined: insufficient funds".to_string(),
        };

        Ok(PaymentResult {
            status,
            transaction_id,
            message,
            amount: request.amount,
            currency,
            description: request
                .description
                .unwrap_or_else(|| "Simulated payment".to_string()),
            account_number: current.account_number,
            remaining_balance: balance_after,
            card_last4,
        })
    }

    /// Administrative balance/currency adjustment.
    ///
    /// The `add_balance` path appends a manual_topup ledger entry; the
    /// absolute `balance` path does not.
    // TODO: decide whether absolute balance sets should also append a ledger
    // entry; today only the add_balance path leaves history.
    pub async fn adjust_balance(
        &self,
        account_number: &str,
        adjustment: BalanceAdjustment,
    ) -> Result<Account> {
        if adjustment.balance.is_some() && adjustment.add_balance.is_some() {
            return Err(PaymentError::Conflict(
                "balance and add_balance are mutually exclusive".to_string(),
            ));
        }

        let mut account = self
            .accounts
            .find_by_number(account_number)
            .await?
            .ok_or_else(|| {
                PaymentError::NotFound(format!("account {account_number} not found"))
            })?;

        if let Some(currency) = adjustment.currency {
            if !self.accounts.set_currency(account_number, currency).await? {
                return Err(PaymentError::NotFound(format!(
                    "account {account_number} not found"
                )));
            }
            account.currency = currency;
        }

        if let Some(target) = adjustment.balance {
            if target < Decimal::ZERO {
                return Err(PaymentError::Validation(
                    "balance must not be negative".to_string(),
                ));
            }
            loop {
                match self
                    .accounts
                    .compare_and_swap_balance(account_number, account.balance, target)
                    .await?
                {
                    BalanceSwap::Applied => {
                        account.balance = target;
                        break;
                    }
                    BalanceSwap::Conflict => account = self.reload(account_number).await?,
                    BalanceSwap::Missing => {
                        return Err(PaymentError::NotFound(format!(
                            "account {account_number} not found"
                        )));
                    }
                }
            }
        }

        if let Some(delta) = adjustment.add_balance {
            loop {
                let new_balance = account.balance + delta;
                if new_balance < Decimal::ZERO {
                    return Err(PaymentError::Validation(format!(
                        "adjustment of {delta} would overdraw balance {}",
                        account.balance
                    )));
                }
                match self
                    .accounts
                    .compare_and_swap_balance(account_number, account.balance, new_balance)
                    .await?
                {
                    BalanceSwap::Applied => {
                        account.balance = new_balance;
                        self.recorder.record(LedgerEntry {
                            account_number: account_number.to_string(),
                            entry_type: if delta >= Decimal::ZERO {
                                EntryType::Credit
                            } else {
                                EntryType::Debit
                            },
                            amount: delta.abs(),
                            currency: account.currency,
                            description: "Manual balance adjustment".to_string(),
                            source: EntrySource::ManualTopup,
                            transaction_id: None,
                            balance_after: new_balance,
                            merchant_name: None,
                            created_at: Utc::now(),
                        });
                        break;
                    }
                    BalanceSwap::Conflict => account = self.reload(account_number).await?,
                    BalanceSwap::Missing => {
                        return Err(PaymentError::NotFound(format!(
                            "account {account_number} not found"
                        )));
                    }
                }
            }
        }

        Ok(account)
    }

    /// Ledger history for one account, newest first, capped at
    /// [`HISTORY_PAGE_SIZE`]. Works for deleted accounts too: history
    /// outlives the account record.
    pub async fn list_transactions(&self, account_number: &str) -> Result<Vec<LedgerEntry>> {
        self.ledger
            .recent_for_account(account_number, HISTORY_PAGE_SIZE)
            .await
    }

    /// Provisions and stores a new account.
    pub async fn open_account(&self, details: NewAccount) -> Result<Account> {
        if details.opening_balance < Decimal::ZERO {
            return Err(PaymentError::Validation(
                "opening balance must not be negative".to_string(),
            ));
        }
        let mut account = provisioning::provision_account(
            &details.owner_name,
            details.currency,
            details.opening_balance,
        );
        if let Some(number) = details.account_number {
            account.account_number = number;
        }
        if let Some(card) = details.card {
            account.card = card;
        }
        self.accounts.insert(account.clone()).await?;
        info!(account_number = %account.account_number, "account opened");
        Ok(account)
    }

    /// Deletes the account record. Existing ledger entries keep referencing
    /// the number; history is not cascaded.
    pub async fn delete_account(&self, account_number: &str) -> Result<()> {
        if !self.accounts.delete(account_number).await? {
            return Err(PaymentError::NotFound(format!(
                "account {account_number} not found"
            )));
        }
        Ok(())
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.accounts.list_recent().await
    }

    /// Waits for all queued ledger appends. Intended for shutdown and tests;
    /// the payment path never calls this.
    pub async fn flush_ledger(&self) {
        self.recorder.flush().await;
    }

    async fn reload(&self, account_number: &str) -> Result<Account> {
        self.accounts
            .find_by_number(account_number)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("account {account_number} not found")))
    }

    fn next_transaction_id(&self) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "POVY-{}{:04}",
            Utc::now().timestamp_millis(),
            sequence % 10_000
        )
    }
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(PaymentError::Validation(
            "amount must be a positive number".to_string(),
        ));
    }
    Ok(())
}
