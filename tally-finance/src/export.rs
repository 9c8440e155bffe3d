//! CSV export of extracted transactions.

use std::io::Write;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tally_core::{Transaction, TransactionType};
use uuid::Uuid;

#[derive(Serialize)]
struct Row<'a> {
    date: NaiveDate,
    post_date: Option<NaiveDate>,
    description: &'a str,
    merchant: &'a str,
    category: &'static str,
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    amount: Decimal,
    statement_id: Uuid,
    account_id: Option<Uuid>,
}

/// Write one header row and one row per transaction.
pub fn write_transactions_csv<W: Write>(
    out: W,
    transactions: &[Transaction],
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(out);
    for t in transactions {
        wtr.serialize(Row {
            date: t.transaction_date,
            post_date: t.post_date,
            description: &t.description,
            merchant: &t.merchant_name,
            category: t.category.map_or("", |c| c.name()),
            transaction_type: t.transaction_type,
            amount: t.amount,
            statement_id: t.statement_id,
            account_id: t.account_id,
        })?;
    }
    wtr.flush()?;
    Ok(())
}
