//! American Express (screen-reader layout)
//!
//! Expected extracted-text rows:
//!   01/27/26*  AUTOPAY PAYMENT RECEIVED - THANK YOU   -$1,200.00
//!   01/03/26   AplPay STARBUCKS NEW YORK NY            $6.45
//!
//! Dates always carry a year; the asterisk marks payments. Continuation
//! lines (phone numbers, references) are skipped by the row pattern.

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::{
    Account, AccountMetadata, AccountType, InstitutionCode, Statement, Transaction, TransactionType,
    fill_if_unset, normalize_merchant,
};
use tracing::{debug, info};

use super::StatementExtractor;
use super::common::{
    Cascade, Owner, Section, SummaryPatterns, capture, contains_any_upper, is_summary_description,
    lines, money, parse_amount, percent, period_or_fallback, section_after,
};

static ROWS: Lazy<Cascade> = Lazy::new(|| {
    Cascade::new(&[(
        "dated",
        r"^(?P<date>\d{2}/\d{2}/\d{2})\*?\s+(?P<desc>.+?)\s+(?P<amount>-?\$[\d,]+\.\d{2})\s*$",
    )])
});

static MIN_PAYMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)minimum\s+payment\s+due\s+\$?([\d,]+\.\d{2})").unwrap());
static DUE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)payment\s+due\s+date\s+(\d{1,2}/\d{1,2}/\d{2,4})").unwrap());
static YTD_FEES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)total\s+fees\s+in\s+(\d{4})\s+\$?([\d,]+\.\d{2})").unwrap());
static YTD_INTEREST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)total\s+interest\s+in\s+(\d{4})\s+\$?([\d,]+\.\d{2})").unwrap());

// "Purchases  04/01/2023    28.49%    Variable"
static PURCHASES_APR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpurchases\b[^\n]{0,80}?(\d{1,2}\.\d{2})%").unwrap());
static CREDIT_LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)credit\s+limit\s+\$?([\d,]+\.\d{2})").unwrap());
static AVAILABLE_CREDIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)available\s+credit\s+\$?([\d,]+\.\d{2})").unwrap());
// Line-anchored so prose like "your new balance of" is ignored
static NEW_BALANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^new\s+balance\s+\$([\d,]+\.\d{2})\s*$").unwrap());
// "Account Ending 9-04001"
static ACCOUNT_ENDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)(?:account|card)\s+ending\s+[\d-]*(\d{4})\s*$").unwrap());

static APLPAY_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^AplPay\s+").unwrap());
static TRAILING_LOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\s+[A-Z][A-Za-z]{2,}){0,2}\s+[A-Z]{2}\s*$").unwrap());

pub struct AmexExtractor {
    tz: Tz,
}

impl Default for AmexExtractor {
    fn default() -> Self {
        Self::new(chrono_tz::America::Chicago)
    }
}

impl AmexExtractor {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

/// `AplPay` prefix off, shared cleanup, then a trailing `City ST` suffix
/// when something useful is left.
pub fn clean_merchant(description: &str) -> String {
    let name = APLPAY_PREFIX.replace(description.trim(), "");
    let name = normalize_merchant(&name);
    let stripped = TRAILING_LOCATION.replace(&name, "");
    let stripped = stripped.trim();
    if stripped.chars().count() >= 2 {
        stripped.to_string()
    } else {
        name
    }
}

fn section_of(lower: &str) -> Option<Section> {
    if lower.starts_with("new charges") || lower.starts_with("charges") {
        Some(Section::Purchases)
    } else if lower.starts_with("payments") {
        Some(Section::Payments)
    } else if lower.starts_with("interest charged") || lower.starts_with("fees") {
        Some(Section::Interest)
    } else {
        None
    }
}

impl StatementExtractor for AmexExtractor {
    fn institution(&self) -> InstitutionCode {
        InstitutionCode::Amex
    }

    fn extract_transactions(
        &self,
        text: &str,
        statement: &mut Statement,
        account: Option<&Account>,
    ) -> Vec<Transaction> {
        let period = period_or_fallback(None, statement, self.tz);
        SummaryPatterns {
            issuer: "amex",
            min_payment: Some(&MIN_PAYMENT),
            due_date: Some(&DUE_DATE),
            ytd_fees: Some(&YTD_FEES),
            ytd_interest: Some(&YTD_INTEREST),
        }
        .apply(text, statement, &period);

        let owner = Owner::of(statement, account);
        let mut section = Section::Unknown;
        let mut out = Vec::new();

        for line in lines(text) {
            let lower = line.to_lowercase();
            if let Some(next) = section_of(&lower) {
                section = next;
                continue;
            }
            if lower.starts_with("about trailing interest") || lower.starts_with("important notices") {
                section = Section::Unknown;
            }

            let Some(m) = ROWS.match_line(line) else {
                continue;
            };
            if is_summary_description(m.desc) {
                continue;
            }
            let (Some(date), Some(amount)) = (period.resolve(m.date), parse_amount(m.amount)) else {
                debug!(line, "amex: unparseable row");
                continue;
            };

            let upper = m.desc.to_uppercase();
            let ty = if section == Section::Interest {
                TransactionType::Interest
            } else if section == Section::Payments
                || contains_any_upper(&upper, &["PAYMENT RECEIVED", "AUTOPAY"])
                || amount.is_sign_negative()
            {
                TransactionType::Credit
            } else {
                TransactionType::Debit
            };

            let merchant = clean_merchant(m.desc);
            debug!(%date, merchant, %amount, "amex row");
            out.push(owner.transaction(date, None, m.desc, &merchant, amount, ty));
        }

        info!(count = out.len(), "amex extractor done");
        out
    }

    fn extract_account_metadata(&self, text: &str, account: &mut AccountMetadata) {
        // Amex only issues cards
        fill_if_unset(&mut account.account_type, Some(AccountType::CreditCard));

        let apr_section = section_after(text, "interest charge calculation", 2000);
        if fill_if_unset(&mut account.apr, capture(&PURCHASES_APR, apr_section, 1).and_then(percent)) {
            debug!(apr = ?account.apr, "amex: apr");
        }
        fill_if_unset(&mut account.credit_limit, capture(&CREDIT_LIMIT, text, 1).and_then(money));
        fill_if_unset(&mut account.available_credit, capture(&AVAILABLE_CREDIT, text, 1).and_then(money));
        if let Some(balance) = capture(&NEW_BALANCE, text, 1).and_then(money) {
            account.current_balance = Some(balance);
        }
        fill_if_unset(&mut account.last4, capture(&ACCOUNT_ENDING, text, 1).map(str::to_string));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    const SAMPLE: &str = r#"
American Express
Platinum Card
Account Ending 9-04001
New Balance $2,471.93
Minimum Payment Due $40.00
Payment Due Date 02/21/26
Payments and Credits
01/27/26* AUTOPAY PAYMENT RECEIVED - THANK YOU -$1,200.00
New Charges
01/03/26 AplPay STARBUCKS NEW YORK NY $6.45
(212) 555-0100
01/05/26 NETFLIX.COM LOS GATOS CA $15.49
Total New Charges $21.94
Interest Charged
01/25/26 Interest Charge on Purchases $72.72
Total Fees in 2026 $0.00
Total Interest in 2026 $72.72
About Trailing Interest
Interest Charge Calculation
Purchases 04/01/2023 28.49% (v) $2,000.00 $72.72
Credit Limit $10,000.00
Available Credit $7,528.07
"#;

    fn run() -> (Statement, Vec<Transaction>) {
        let mut st = Statement::new("amex.pdf");
        let txns = AmexExtractor::default().extract_transactions(SAMPLE, &mut st, None);
        (st, txns)
    }

    #[test]
    fn test_rows_and_sections() {
        let (_, txns) = run();
        assert_eq!(txns.len(), 4);

        assert_eq!(txns[0].transaction_type, TransactionType::Credit);
        assert_eq!(txns[0].amount, Decimal::new(120000, 2));
        assert_eq!(txns[0].transaction_date, NaiveDate::from_ymd_opt(2026, 1, 27).unwrap());

        assert_eq!(txns[1].merchant_name, "STARBUCKS");
        assert_eq!(txns[1].transaction_type, TransactionType::Debit);
        assert_eq!(txns[2].merchant_name, "NETFLIX.COM");
        assert_eq!(txns[2].category, Some(tally_core::Category::Subscriptions));

        assert_eq!(txns[3].transaction_type, TransactionType::Interest);
        assert_eq!(txns[3].category, Some(tally_core::Category::Fees));
    }

    #[test]
    fn test_statement_summary() {
        let (st, _) = run();
        assert_eq!(st.minimum_payment, Some(Decimal::new(4000, 2)));
        assert_eq!(st.payment_due_date, NaiveDate::from_ymd_opt(2026, 2, 21));
        assert_eq!(st.ytd_total_fees, Some(Decimal::new(0, 2)));
        assert_eq!(st.ytd_total_interest, Some(Decimal::new(7272, 2)));
        assert_eq!(st.ytd_year, Some(2026));
    }

    #[test]
    fn test_account_metadata() {
        let mut meta = AccountMetadata::default();
        AmexExtractor::default().extract_account_metadata(SAMPLE, &mut meta);
        assert_eq!(meta.account_type, Some(AccountType::CreditCard));
        assert_eq!(meta.last4.as_deref(), Some("4001"));
        assert_eq!(meta.apr, Some(Decimal::new(2849, 2)));
        assert_eq!(meta.credit_limit, Some(Decimal::new(1000000, 2)));
        assert_eq!(meta.available_credit, Some(Decimal::new(752807, 2)));
        assert_eq!(meta.current_balance, Some(Decimal::new(247193, 2)));
    }

    #[test]
    fn test_metadata_keeps_known_fields_but_refreshes_balance() {
        let mut meta = AccountMetadata {
            apr: Some(Decimal::new(1999, 2)),
            current_balance: Some(Decimal::new(1, 2)),
            ..Default::default()
        };
        AmexExtractor::default().extract_account_metadata(SAMPLE, &mut meta);
        assert_eq!(meta.apr, Some(Decimal::new(1999, 2)));
        assert_eq!(meta.current_balance, Some(Decimal::new(247193, 2)));
    }

    #[test]
    fn test_clean_merchant() {
        assert_eq!(clean_merchant("AplPay CHIPOTLE AUSTIN TX"), "CHIPOTLE");
        // Up to two capitalised words before the state go with it
        assert_eq!(clean_merchant("WHOLE FOODS AUSTIN TX"), "WHOLE");
        assert_eq!(clean_merchant("UBER TRIP 8005928996 CA"), "UBER TRIP");
        assert_eq!(clean_merchant("NY"), "NY");
    }
}
