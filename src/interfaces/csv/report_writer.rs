use crate::domain::account::Account;
use crate::error::Result;
use std::io::Write;

/// Writes the final account report as CSV.
///
/// Card numbers are masked to their last four digits; the full number, expiry
/// and CVV never appear in reports.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts(&mut self, accounts: &[Account]) -> Result<()> {
        self.writer
            .write_record(["account_number", "owner_name", "balance", "currency", "card_last4"])?;
        for account in accounts {
            let balance = account.balance.to_string();
            self.writer.write_record([
                account.account_number.as_str(),
                account.owner_name.as_str(),
                balance.as_str(),
                account.currency.as_str(),
                account.card.last4(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{Card, Currency};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_report_masks_card_number() {
        let account = Account {
            account_number: "1234567890".to_string(),
            owner_name: "Alice".to_string(),
            balance: dec!(6000),
            currency: Currency::Usd,
            card: Card {
                number: "4000123412341234".to_string(),
                exp_month: "09".to_string(),
                exp_year: "2030".to_string(),
                cvv: "123".to_string(),
            },
            created_at: Utc::now(),
        };

        let mut buffer = Vec::new();
        ReportWriter::new(&mut buffer)
            .write_accounts(std::slice::from_ref(&account))
            .unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert!(output.contains("1234567890,Alice,6000,USD,1234"));
        assert!(!output.contains("4000123412341234"));
        assert!(!output.contains("123,")); // cvv never serialized as a field
    }
}
