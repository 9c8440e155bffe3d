//! Fallback extractor for unknown issuers.
//!
//! One broad pattern, searched anywhere in each line: a date, 10 to 60
//! characters of description, then a currency amount. The amount's sign is
//! the only type signal. No metadata is read.

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::{Account, InstitutionCode, Statement, Transaction, TransactionType};
use tracing::{debug, info};

use super::StatementExtractor;
use super::common::{Owner, Period, lines, parse_amount, period_or_fallback};

static GENERIC_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<date>\d{1,2}/\d{1,2}(?:/\d{2,4})?|\w{3}\s+\d{1,2},?\s*\d{4})\s+",
        r"(?P<desc>.{10,60}?)\s+",
        r"(?P<amount>-?\$?\d{1,3}(?:,\d{3})*\.\d{2})",
    ))
    .unwrap()
});

pub struct GenericExtractor {
    tz: Tz,
}

impl Default for GenericExtractor {
    fn default() -> Self {
        Self::new(chrono_tz::America::Chicago)
    }
}

impl GenericExtractor {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl StatementExtractor for GenericExtractor {
    fn institution(&self) -> InstitutionCode {
        InstitutionCode::Generic
    }

    fn extract_transactions(
        &self,
        text: &str,
        statement: &mut Statement,
        account: Option<&Account>,
    ) -> Vec<Transaction> {
        let period = period_or_fallback(None, statement, self.tz);
        let out = parse_lines(text, &period, Owner::of(statement, account));
        info!(count = out.len(), "generic extractor done");
        out
    }
}

/// Run the broad pattern over every line, resolving yearless dates against
/// `period`.
pub fn parse_lines(text: &str, period: &Period, owner: Owner) -> Vec<Transaction> {
    let mut out = Vec::new();
    for line in lines(text) {
        let Some(caps) = GENERIC_LINE.captures(line) else {
            continue;
        };
        let Some(date) = period.resolve(&caps["date"]) else {
            debug!(line, "unparseable date");
            continue;
        };
        let Some(amount) = parse_amount(&caps["amount"]) else {
            continue;
        };
        let desc = caps["desc"].trim();
        let ty = if amount.is_sign_negative() {
            TransactionType::Credit
        } else {
            TransactionType::Debit
        };
        out.push(owner.transaction(date, None, desc, desc, amount, ty));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn statement_for(start: (i32, u32, u32), end: (i32, u32, u32)) -> Statement {
        let mut st = Statement::new("generic.pdf");
        st.start_date = NaiveDate::from_ymd_opt(start.0, start.1, start.2);
        st.end_date = NaiveDate::from_ymd_opt(end.0, end.1, end.2);
        st
    }

    #[test]
    fn test_payment_line_is_credit() {
        let mut st = statement_for((2026, 1, 16), (2026, 2, 15));
        let txns = GenericExtractor::default().extract_transactions(
            "02/12     AUTOMATIC PAYMENT - THANK YOU -40.00",
            &mut st,
            None,
        );
        assert_eq!(txns.len(), 1);
        let t = &txns[0];
        assert_eq!(t.transaction_type, TransactionType::Credit);
        assert_eq!(t.amount, Decimal::new(4000, 2));
        assert_eq!(t.transaction_date, NaiveDate::from_ymd_opt(2026, 2, 12).unwrap());
        assert_eq!(t.category, None);
    }

    #[test]
    fn test_debit_and_named_dates() {
        let mut st = statement_for((2026, 1, 1), (2026, 1, 31));
        let text = r#"
Some Credit Union
01/05/2026 WHOLE FOODS MARKET #123 $84.12
Jan 9, 2026 SHELL OIL 57442 AUSTIN TX 41.00
Balance forward
"#;
        let txns = GenericExtractor::default().extract_transactions(text, &mut st, None);
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].merchant_name, "WHOLE FOODS MARKET #123");
        assert_eq!(txns[0].transaction_type, TransactionType::Debit);
        assert_eq!(txns[0].category, Some(tally_core::Category::Groceries));
        assert_eq!(txns[1].transaction_date, NaiveDate::from_ymd_opt(2026, 1, 9).unwrap());
        assert_eq!(txns[1].merchant_name, "SHELL OIL");
    }

    #[test]
    fn test_short_description_is_skipped() {
        let mut st = statement_for((2026, 1, 1), (2026, 1, 31));
        let txns = GenericExtractor::default().extract_transactions("01/05 FEE 4.00", &mut st, None);
        assert!(txns.is_empty());
    }

    #[test]
    fn test_no_metadata() {
        let mut meta = tally_core::AccountMetadata::default();
        GenericExtractor::default().extract_account_metadata("Credit Limit $5,000.00", &mut meta);
        assert_eq!(meta, tally_core::AccountMetadata::default());
    }
}
