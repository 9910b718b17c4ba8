use crate::domain::ledger::LedgerEntry;
use crate::domain::ports::LedgerStoreHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::error;

enum Command {
    Append(LedgerEntry),
    Flush(oneshot::Sender<()>),
}

/// Best-effort ledger writer.
///
/// Entries are handed to a background task over a channel, so a slow or
/// failing ledger store never delays or fails the payment response that the
/// entry describes. A failed append is logged and dropped; the payment
/// outcome it records has already been committed and reported.
#[derive(Clone)]
pub struct TransactionRecorder {
    tx: mpsc::UnboundedSender<Command>,
}

impl TransactionRecorder {
    pub fn new(ledger: LedgerStoreHandle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Append(entry) => {
                        let account_number = entry.account_number.clone();
                        if let Err(e) = ledger.append(entry).await {
                            error!(
                                account_number = %account_number,
                                error = %e,
                                "ledger append failed; entry dropped"
                            );
                        }
                    }
                    Command::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });
        Self { tx }
    }

    /// Queues one entry. Never fails the caller.
    pub fn record(&self, entry: LedgerEntry) {
        if self.tx.send(Command::Append(entry)).is_err() {
            error!("ledger recorder task has stopped; entry dropped");
        }
    }

    /// Resolves once every entry queued before this call has been written
    /// (or dropped after a failed append). Used to drain before shutdown.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Currency;
    use crate::domain::ledger::{EntrySource, EntryType};
    use crate::domain::ports::LedgerStore;
    use crate::error::{PaymentError, Result};
    use crate::infrastructure::in_memory::InMemoryLedgerStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn entry(account_number: &str) -> LedgerEntry {
        LedgerEntry {
            account_number: account_number.to_string(),
            entry_type: EntryType::Debit,
            amount: dec!(10),
            currency: Currency::Usd,
            description: "test".to_string(),
            source: EntrySource::AccountPayment,
            transaction_id: Some("POVY-test".to_string()),
            balance_after: dec!(90),
            merchant_name: None,
            created_at: Utc::now(),
        }
    }

    struct FailingLedgerStore;

    #[async_trait]
    impl LedgerStore for FailingLedgerStore {
        async fn append(&self, _entry: LedgerEntry) -> Result<()> {
            Err(PaymentError::Persistence("ledger down".to_string()))
        }

        async fn recent_for_account(
            &self,
            _account_number: &str,
            _limit: usize,
        ) -> Result<Vec<LedgerEntry>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_record_then_flush_makes_entry_visible() {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let recorder = TransactionRecorder::new(ledger.clone());

        recorder.record(entry("111"));
        recorder.flush().await;

        let entries = ledger.recent_for_account("111", 50).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_store_is_swallowed() {
        let recorder = TransactionRecorder::new(Arc::new(FailingLedgerStore));

        recorder.record(entry("111"));
        recorder.record(entry("222"));
        // Drains without surfacing the persistence failure.
        recorder.flush().await;
    }

    #[tokio::test]
    async fn test_entries_are_written_in_submission_order() {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let recorder = TransactionRecorder::new(ledger.clone());

        for i in 0..5 {
            let mut e = entry("333");
            e.description = format!("entry-{i}");
            recorder.record(e);
        }
        recorder.flush().await;

        let entries = ledger.recent_for_account("333", 50).await.unwrap();
        assert_eq!(entries.len(), 5);
        // Newest first
        assert_eq!(entries[0].description, "entry-4");
        assert_eq!(entries[4].description, "entry-0");
    }
}
