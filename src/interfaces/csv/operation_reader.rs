use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One scripted operation against the simulator.
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    /// Create an account (explicit number/card or generated).
    Open,
    /// Payment by account number.
    Pay,
    /// Payment by card details.
    CardPay,
    /// Signed balance delta (manual top-up).
    Topup,
    /// Absolute balance set.
    SetBalance,
}

/// A CSV row describing one operation. Columns not used by the given `op`
/// are left empty; `csv` maps empty fields to `None`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OperationRecord {
    pub op: OpKind,
    pub account: Option<String>,
    pub owner: Option<String>,
    pub card: Option<String>,
    pub exp_month: Option<String>,
    pub exp_year: Option<String>,
    pub cvv: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub merchant: Option<String>,
}

/// Reads operations from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// yielding a lazy iterator so large scripts stream without loading the whole
/// file.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    /// Creates a reader from any `Read` source (e.g. File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn operations(self) -> impl Iterator<Item = Result<OperationRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str =
        "op,account,owner,card,exp_month,exp_year,cvv,amount,currency,description,merchant";

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "{HEADER}\nopen,1234567890,Alice,,,,,10000,USD,,\npay,1234567890,,,,,,4000,,lunch,Cafe Rio"
        );
        let reader = OperationReader::new(data.as_bytes());
        let records: Vec<Result<OperationRecord>> = reader.operations().collect();

        assert_eq!(records.len(), 2);
        let open = records[0].as_ref().unwrap();
        assert_eq!(open.op, OpKind::Open);
        assert_eq!(open.owner.as_deref(), Some("Alice"));
        assert_eq!(open.amount, Some(dec!(10000)));

        let pay = records[1].as_ref().unwrap();
        assert_eq!(pay.op, OpKind::Pay);
        assert!(pay.owner.is_none());
        assert_eq!(pay.merchant.as_deref(), Some("Cafe Rio"));
    }

    #[test]
    fn test_reader_card_payment_row() {
        let data = format!(
            "{HEADER}\ncardpay,,,4000123412341234,09,2030,123,250,MXN,,"
        );
        let reader = OperationReader::new(data.as_bytes());
        let record = reader.operations().next().unwrap().unwrap();
        assert_eq!(record.op, OpKind::CardPay);
        assert_eq!(record.card.as_deref(), Some("4000123412341234"));
        assert_eq!(record.cvv.as_deref(), Some("123"));
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = format!("{HEADER}\nexplode,,,,,,,1.0,,,");
        let reader = OperationReader::new(data.as_bytes());
        let records: Vec<Result<OperationRecord>> = reader.operations().collect();
        assert!(records[0].is_err());
    }
}
