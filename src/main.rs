use clap::Parser;
use miette::{IntoDiagnostic, Result};
use povy::application::coordinator::{
    BalanceAdjustment, CardDetails, NewAccount, PaymentCoordinator, PaymentRequest, PaymentStatus,
};
use povy::domain::account::{Card, Currency};
use povy::domain::ports::{AccountStoreHandle, LedgerStoreHandle};
use povy::error::PaymentError;
use povy::infrastructure::in_memory::{InMemoryAccountStore, InMemoryLedgerStore};
use povy::interfaces::csv::operation_reader::{OpKind, OperationReader, OperationRecord};
use povy::interfaces::csv::report_writer::ReportWriter;
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let coordinator = build_coordinator(cli.db_path)?;

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = OperationReader::new(file);
    for record in reader.operations() {
        match record {
            Ok(record) => {
                if let Err(e) = apply_operation(&coordinator, record).await {
                    eprintln!("Error processing operation [{}]: {}", e.kind(), e);
                }
            }
            Err(e) => eprintln!("Error reading operation: {e}"),
        }
    }

    // Drain queued ledger appends before reporting.
    coordinator.flush_ledger().await;

    let accounts = coordinator.list_accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_accounts(&accounts).into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn build_coordinator(db_path: Option<PathBuf>) -> Result<PaymentCoordinator> {
    use povy::infrastructure::rocksdb::RocksDbStore;

    Ok(if let Some(db_path) = db_path {
        let store = RocksDbStore::open(db_path).into_diagnostic()?;
        let accounts: AccountStoreHandle = Arc::new(store.clone());
        let ledger: LedgerStoreHandle = Arc::new(store);
        PaymentCoordinator::new(accounts, ledger)
    } else {
        in_memory_coordinator()
    })
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_coordinator(db_path: Option<PathBuf>) -> Result<PaymentCoordinator> {
    if db_path.is_some() {
        return Err(miette::miette!(
            "--db-path requires the storage-rocksdb feature; rebuild with --features storage-rocksdb"
        ));
    }
    Ok(in_memory_coordinator())
}

fn in_memory_coordinator() -> PaymentCoordinator {
    let accounts: AccountStoreHandle = Arc::new(InMemoryAccountStore::new());
    let ledger: LedgerStoreHandle = Arc::new(InMemoryLedgerStore::new());
    PaymentCoordinator::new(accounts, ledger)
}

async fn apply_operation(
    coordinator: &PaymentCoordinator,
    record: OperationRecord,
) -> std::result::Result<(), PaymentError> {
    match record.op {
        OpKind::Open => {
            let card = explicit_card(&record);
            let account = coordinator
                .open_account(NewAccount {
                    owner_name: required(record.owner, "owner")?,
                    currency: parse_currency(record.currency)?.unwrap_or(Currency::Usd),
                    opening_balance: record.amount.unwrap_or(Decimal::ZERO),
                    account_number: record.account,
                    card,
                })
                .await?;
            println!(
                "opened {} owner={} balance={}",
                account.account_number, account.owner_name, account.balance
            );
        }
        OpKind::Pay => {
            let request = payment_request(&record)?;
            let account_number = required(record.account, "account")?;
            let result = coordinator
                .pay_by_account(&account_number, request)
                .await?;
            print_result(&result);
        }
        OpKind::CardPay => {
            let card = CardDetails {
                number: required(record.card.clone(), "card")?,
                exp_month: required(record.exp_month.clone(), "exp_month")?,
                exp_year: required(record.exp_year.clone(), "exp_year")?,
                cvv: required(record.cvv.clone(), "cvv")?,
            };
            let result = coordinator
                .pay_by_card(card, payment_request(&record)?)
                .await?;
            print_result(&result);
        }
        OpKind::Topup => {
            let account_number = required(record.account, "account")?;
            let account = coordinator
                .adjust_balance(
                    &account_number,
                    BalanceAdjustment {
                        currency: parse_currency(record.currency)?,
                        add_balance: Some(required(record.amount, "amount")?),
                        ..Default::default()
                    },
                )
                .await?;
            println!("adjusted {} balance={}", account.account_number, account.balance);
        }
        OpKind::SetBalance => {
            let account_number = required(record.account, "account")?;
            let account = coordinator
                .adjust_balance(
                    &account_number,
                    BalanceAdjustment {
                        currency: parse_currency(record.currency)?,
                        balance: Some(required(record.amount, "amount")?),
                        ..Default::default()
                    },
                )
                .await?;
            println!("adjusted {} balance={}", account.account_number, account.balance);
        }
    }
    Ok(())
}

fn payment_request(record: &OperationRecord) -> std::result::Result<PaymentRequest, PaymentError> {
    Ok(PaymentRequest {
        amount: required(record.amount, "amount")?,
        currency: parse_currency(record.currency.clone())?,
        description: record.description.clone(),
        merchant_name: record.merchant.clone(),
    })
}

fn explicit_card(record: &OperationRecord) -> Option<Card> {
    match (&record.card, &record.exp_month, &record.exp_year, &record.cvv) {
        (Some(number), Some(exp_month), Some(exp_year), Some(cvv)) => Some(Card {
            number: number.clone(),
            exp_month: exp_month.clone(),
            exp_year: exp_year.clone(),
            cvv: cvv.clone(),
        }),
        _ => None,
    }
}

fn parse_currency(
    value: Option<String>,
) -> std::result::Result<Option<Currency>, PaymentError> {
    value.map(|v| v.parse()).transpose()
}

fn required<T>(value: Option<T>, field: &str) -> std::result::Result<T, PaymentError> {
    value.ok_or_else(|| PaymentError::Validation(format!("missing required field: {field}")))
}

fn print_result(result: &povy::application::coordinator::PaymentResult) {
    let status = match result.status {
        PaymentStatus::Approved => "approved",
        PaymentStatus::Declined => "declined",
    };
    match &result.card_last4 {
        Some(last4) => println!(
            "{status} {} account={} card_last4={} amount={} {} remaining={}",
            result.transaction_id,
            result.account_number,
            last4,
            result.amount,
            result.currency,
            result.remaining_balance
        ),
        None => println!(
            "{status} {} account={} amount={} {} remaining={}",
            result.transaction_id,
            result.account_number,
            result.amount,
            result.currency,
            result.remaining_balance
        ),
    }
}
