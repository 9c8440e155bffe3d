//! Wells Fargo cards and accounts
//!
//! Rows are read with the generic line pattern; this extractor only adds
//! the statement period, so yearless dates resolve against the right cycle,
//! and the payment summary.

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::{Account, InstitutionCode, Statement, Transaction};
use tracing::info;

use super::StatementExtractor;
use super::common::{Owner, SummaryPatterns, detect_period, period_or_fallback};
use super::generic;

// "Statement Period 01/06/2026 to 02/05/2026"
static PERIOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?:statement\s+period|billing\s+cycle)[:\s]+(\d{1,2}/\d{1,2}/\d{2,4})",
        r"\s*(?:-|–|to|through)\s*(\d{1,2}/\d{1,2}/\d{2,4})"
    ))
    .unwrap()
});
static MIN_PAYMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)minimum\s+payment(?:\s+due)?[:\s]+\$?([\d,]+\.\d{2})").unwrap());
static DUE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)payment\s+due\s+date[:\s]+(\d{1,2}/\d{1,2}/\d{2,4})").unwrap());

pub struct WellsFargoExtractor {
    tz: Tz,
}

impl Default for WellsFargoExtractor {
    fn default() -> Self {
        Self::new(chrono_tz::America::Chicago)
    }
}

impl WellsFargoExtractor {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl StatementExtractor for WellsFargoExtractor {
    fn institution(&self) -> InstitutionCode {
        InstitutionCode::WellsFargo
    }

    fn extract_transactions(
        &self,
        text: &str,
        statement: &mut Statement,
        account: Option<&Account>,
    ) -> Vec<Transaction> {
        let period = period_or_fallback(detect_period(text, &[&PERIOD]), statement, self.tz);
        info!(start = %period.start, end = %period.end, "wells fargo statement period");

        SummaryPatterns {
            issuer: "wells_fargo",
            min_payment: Some(&MIN_PAYMENT),
            due_date: Some(&DUE_DATE),
            ytd_fees: None,
            ytd_interest: None,
        }
        .apply(text, statement, &period);

        let out = generic::parse_lines(text, &period, Owner::of(statement, account));
        info!(count = out.len(), "wells fargo extractor done");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tally_core::TransactionType;

    const SAMPLE: &str = r#"
Wells Fargo Active Cash Card
Statement Period 12/20/2025 to 01/19/2026
Payment Due Date 02/14/2026
Minimum Payment $40.00
12/28  SAFEWAY #1234 PORTLAND OR  58.12
01/05  ONLINE PAYMENT THANK YOU  -300.00
01/11  SPOTIFY USA 8774467554  11.99
"#;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_rows_resolve_across_year_end() {
        let mut st = Statement::new("wf.pdf");
        let txns = WellsFargoExtractor::default().extract_transactions(SAMPLE, &mut st, None);
        assert_eq!(txns.len(), 3);
        assert_eq!(txns[0].transaction_date, d(2025, 12, 28));
        assert_eq!(txns[0].category, Some(tally_core::Category::Groceries));
        assert_eq!(txns[1].transaction_type, TransactionType::Credit);
        assert_eq!(txns[1].amount, Decimal::new(30000, 2));
        assert_eq!(txns[2].transaction_date, d(2026, 1, 11));
        assert_eq!(txns[2].merchant_name, "SPOTIFY USA");
    }

    #[test]
    fn test_summary() {
        let mut st = Statement::new("wf.pdf");
        WellsFargoExtractor::default().extract_transactions(SAMPLE, &mut st, None);
        assert_eq!(st.minimum_payment, Some(Decimal::new(4000, 2)));
        assert_eq!(st.payment_due_date, Some(d(2026, 2, 14)));
    }
}
