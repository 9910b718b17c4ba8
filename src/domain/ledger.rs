use super::account::Currency;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a ledger entry. `amount` is always a magnitude; the
/// direction lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Debit,
    Credit,
}

/// Which flow produced the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    AccountPayment,
    CardPayment,
    ManualTopup,
}

/// One immutable fact about a balance-affecting (or declined) event.
///
/// Entries reference accounts by number without referential integrity: an
/// account may be deleted while its history persists. `balance_after`
/// snapshots the account balance immediately following the event so audits
/// never need to replay the ledger. `created_at` is the sole ordering key
/// for history queries. Entries are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub account_number: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    pub source: EntrySource,
    /// Correlation id, present for payment-sourced entries only.
    pub transaction_id: Option<String>,
    pub balance_after: Decimal,
    pub merchant_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
