use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currencies supported by the sandbox. No conversion exists between them;
/// the currency on an account is a label, not an exchange-rate domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Mxn,
    Jpy,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Mxn => "MXN",
            Currency::Jpy => "JPY",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "MXN" => Ok(Currency::Mxn),
            "JPY" => Ok(Currency::Jpy),
            other => Err(PaymentError::Validation(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

/// Synthetic card issued with an account. All fields are immutable once
/// issued; expiry and CVV are kept as strings and compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub number: String,
    pub exp_month: String,
    pub exp_year: String,
    pub cvv: String,
}

impl Card {
    /// Verbatim string match of the verification fields.
    pub fn matches(&self, exp_month: &str, exp_year: &str, cvv: &str) -> bool {
        self.exp_month == exp_month && self.exp_year == exp_year && self.cvv == cvv
    }

    /// Last four digits of the card number. This is the only part of the
    /// card that payment results may expose.
    pub fn last4(&self) -> &str {
        let cut = self.number.len().saturating_sub(4);
        &self.number[cut..]
    }
}

/// A test financial identity.
///
/// `account_number` is the stable unique key. `balance` must never be
/// negative after a successful mutation; operations that would overdraw are
/// rejected rather than clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_number: String,
    pub owner_name: String,
    pub balance: Decimal,
    pub currency: Currency,
    pub card: Card,
    pub created_at: DateTime<Utc>,
}
