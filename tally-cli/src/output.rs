//! Human-readable and machine-readable printing. Everything here goes to
//! stdout; logs go to stderr.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tally_core::{Account, Statement, Transaction};
use tally_finance::{StatementSummary, write_transactions_csv};
use tally_ingest::{ExtractionOutcome, TextSource};

#[derive(Serialize)]
pub struct ExtractReport<'a> {
    pub statement: &'a Statement,
    pub account: Option<&'a Account>,
    pub outcome: &'a ExtractionOutcome,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value).context("serialize JSON")?;
    println!("{s}");
    Ok(())
}

/// `-` writes to stdout.
pub fn write_csv(target: &Path, transactions: &[Transaction]) -> Result<()> {
    if target == Path::new("-") {
        let stdout = io::stdout();
        write_transactions_csv(stdout.lock(), transactions).context("write CSV to stdout")?;
        return Ok(());
    }
    let f = File::create(target).with_context(|| format!("create {}", target.display()))?;
    write_transactions_csv(f, transactions).with_context(|| format!("write {}", target.display()))?;
    eprintln!("Wrote {} transactions to {}", transactions.len(), target.display());
    Ok(())
}

/// Wire name of a serde enum, e.g. `COMPLETED`.
fn code<T: Serialize>(v: &T) -> String {
    serde_json::to_value(v)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn opt<T: std::fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn print_extract_report(report: &ExtractReport<'_>) -> Result<()> {
    let st = report.statement;
    let out = report.outcome;
    let mut w = io::stdout().lock();

    let source = match out.source {
        Some(TextSource::TextLayer) => " (text layer)",
        Some(TextSource::Ocr) => " (OCR)",
        None => "",
    };
    writeln!(w, "Institution: {}{source}", out.institution)?;
    if out.used_fallback {
        writeln!(w, "Note: issuer layout not recognised, rows read with the generic pattern")?;
    }
    writeln!(w, "Period:      {} .. {}", opt(&st.start_date), opt(&st.end_date))?;
    writeln!(
        w,
        "Due:         {}  minimum {}",
        opt(&st.payment_due_date),
        opt(&st.minimum_payment)
    )?;
    if st.ytd_year.is_some() {
        writeln!(
            w,
            "YTD {}:    fees {}  interest {}",
            opt(&st.ytd_year),
            opt(&st.ytd_total_fees),
            opt(&st.ytd_total_interest)
        )?;
    }

    let m = &out.metadata;
    writeln!(
        w,
        "Account:     {}last4 {}  APR {}  limit {}  available {}  balance {}",
        report.account.map_or(String::new(), |a| format!("{}  ", a.name)),
        opt(&m.last4),
        opt(&m.apr),
        opt(&m.credit_limit),
        opt(&m.available_credit),
        opt(&m.current_balance)
    )?;
    if m.promo_apr.is_some() {
        writeln!(w, "Promo APR:   {} until {}", opt(&m.promo_apr), opt(&m.promo_apr_end_date))?;
    }

    writeln!(w, "\n{} transactions", out.transactions.len())?;
    for t in &out.transactions {
        writeln!(
            w,
            "  {}  {:<8} {:>10}  {:<32}  {}",
            t.transaction_date,
            code(&t.transaction_type),
            t.amount,
            t.merchant_name,
            opt(&t.category)
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
pub struct ProcessRow {
    pub file: String,
    pub statement: Statement,
    pub account: Option<String>,
    pub summary: StatementSummary,
}

pub fn print_process_table(rows: &[ProcessRow]) -> Result<()> {
    let mut w = io::stdout().lock();
    writeln!(
        w,
        "{:<28} {:<10} {:<26} {:>5} {:>11} {:>11}",
        "FILE", "STATUS", "ACCOUNT", "TXNS", "DEBITS", "CREDITS"
    )?;
    for r in rows {
        writeln!(
            w,
            "{:<28} {:<10} {:<26} {:>5} {:>11} {:>11}",
            r.file,
            code(&r.statement.status),
            r.account.as_deref().unwrap_or("-"),
            r.summary.transaction_count,
            r.summary.total_debits,
            r.summary.total_credits
        )?;
        if let Some(msg) = &r.statement.error_message {
            writeln!(w, "    error: {msg}")?;
        }
        for c in r.summary.by_category.iter().take(3) {
            writeln!(
                w,
                "    {:<20} {:>11} ({})",
                opt(&c.category),
                c.total,
                c.transaction_count
            )?;
        }
    }
    Ok(())
}
