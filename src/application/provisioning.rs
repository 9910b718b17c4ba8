//! Generation of synthetic account numbers and cards.
//!
//! These are plain generators with no contended state; uniqueness is
//! enforced by the account store on insert, not here.

use crate::domain::account::{Account, Card, Currency};
use chrono::{Datelike, Months, Utc};
use rand::Rng;
use rust_decimal::Decimal;

const ACCOUNT_NUMBER_LEN: usize = 10;
const CARD_NUMBER_LEN: usize = 16;
const CARD_VALIDITY_MONTHS: u32 = 48;

fn digits<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| char::from(b'0' + rng.gen_range(0..10))).collect()
}

pub fn new_account_number<R: Rng>(rng: &mut R) -> String {
    // Leading digit kept non-zero so numbers survive naive numeric parsing.
    let mut number = String::with_capacity(ACCOUNT_NUMBER_LEN);
    number.push(char::from(b'1' + rng.gen_range(0..9)));
    number.push_str(&digits(rng, ACCOUNT_NUMBER_LEN - 1));
    number
}

pub fn new_card<R: Rng>(rng: &mut R) -> Card {
    let expiry = Utc::now() + Months::new(CARD_VALIDITY_MONTHS);
    let mut number = String::with_capacity(CARD_NUMBER_LEN);
    number.push('4');
    number.push_str(&digits(rng, CARD_NUMBER_LEN - 1));
    Card {
        number,
        exp_month: format!("{:02}", expiry.month()),
        exp_year: expiry.year().to_string(),
        cvv: digits(rng, 3),
    }
}

/// Builds a fresh account record with a generated number and card.
pub fn provision_account(owner_name: &str, currency: Currency, opening_balance: Decimal) -> Account {
    let mut rng = rand::thread_rng();
    Account {
        account_number: new_account_number(&mut rng),
        owner_name: owner_name.to_string(),
        balance: opening_balance,
        currency,
        card: new_card(&mut rng),
        created_at: Utc::now(),
    }
}
