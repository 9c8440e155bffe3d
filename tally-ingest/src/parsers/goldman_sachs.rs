//! Apple Card statements issued by Goldman Sachs Bank USA
//!
//!   Jan 15, 2026    Apple                        $1.29
//!   Jan 12, 2026    Payment                   ($500.00)
//!
//! Parenthesised amounts are credits.

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tally_core::{
    Account, AccountMetadata, AccountType, InstitutionCode, Statement, Transaction, TransactionType,
    fill_if_unset,
};
use tracing::{debug, info};

use super::StatementExtractor;
use super::common::{
    Cascade, Owner, SummaryPatterns, capture, contains_any_upper, detect_period,
    is_summary_description, lines, mentions_fee, money, parse_amount, parse_full_date, percent,
    period_or_fallback,
};

static ROWS: Lazy<Cascade> = Lazy::new(|| {
    Cascade::new(&[
        (
            "named_date",
            concat!(
                r"^(?P<date>[A-Z][a-z]{2}\s+\d{1,2},\s+\d{4})\s{2,}(?P<desc>.+?)\s{2,}",
                r"(?P<amount>\(\$?[\d,]+\.\d{2}\)|-?\$?[\d,]+\.\d{2})\s*$"
            ),
        ),
        (
            "slash_date",
            concat!(
                r"^(?P<date>\d{1,2}/\d{1,2}/\d{2,4})\s{2,}(?P<desc>.+?)\s{2,}",
                r"(?P<amount>\(\$?[\d,]+\.\d{2}\)|-?\$?[\d,]+\.\d{2})\s*$"
            ),
        ),
        (
            "loose",
            concat!(
                r"^(?P<date>[A-Z][a-z]{2}\s+\d{1,2},\s+\d{4})\s+(?P<desc>.+?)\s+",
                r"(?P<amount>\(\$?[\d,]+\.\d{2}\)|-?\$?[\d,]+\.\d{2})\s*$"
            ),
        ),
    ])
});

// "Billing Period  Jan 1, 2026 - Jan 31, 2026"
static PERIOD_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?:billing\s+period|statement\s+period)[:\s]+([A-Z][a-z]{2}\s+\d{1,2},\s+\d{4})",
        r"\s*[-–]\s*([A-Z][a-z]{2}\s+\d{1,2},\s+\d{4})"
    ))
    .unwrap()
});
static PERIOD_SLASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?:billing\s+period|statement\s+period)[:\s]+(\d{1,2}/\d{1,2}/\d{2,4})",
        r"\s*[-–]\s*(\d{1,2}/\d{1,2}/\d{2,4})"
    ))
    .unwrap()
});

// "Card Number  •••• •••• •••• 1234"
static ACCOUNT_LAST4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:card\s+number|account\s+number)[:\s]+(?:[·•*x\d]{4}[\s-]*){3}(\d{4})").unwrap()
});
static ACCOUNT_ENDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:account|card)\s+ending(?:\s+in)?\s+(\d{4})").unwrap());
static TOTAL_BALANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^(?:total|new)\s+balance\s+\$?([\d,]+\.\d{2})\s*$").unwrap());
static CREDIT_LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)credit\s+limit[:\s]+\$?([\d,]+(?:\.\d{2})?)").unwrap());
static AVAILABLE_CREDIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)available\s+credit[:\s]+\$?([\d,]+(?:\.\d{2})?)").unwrap());

static MIN_PAYMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)minimum\s+(?:payment\s+)?due[:\s]+\$?([\d,]+\.\d{2})").unwrap());
static DUE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)payment\s+due\s+(?:date)?[:\s]+(\d{1,2}/\d{1,2}/\d{2,4}|[A-Z][a-z]{2}\s+\d{1,2},\s+\d{4})")
        .unwrap()
});
// "Variable APR  28.49%", "Purchase APR: 28.49%"
static PURCHASE_APR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:variable\s+|purchase\s+)?(?:purchase\s+)?apr[:\s]+(\d{1,2}\.\d{2})%").unwrap()
});
// "0.00% intro APR ... through 08/31/2026"
static PROMO_APR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2}\.\d{2})%\s+(?:intro(?:ductory)?\s+)?apr[^\n]*?(\d{1,2}/\d{1,2}/\d{2,4})").unwrap()
});
static YTD_FEES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:total\s+)?fees\s+(?:charged\s+)?(?:in\s+(\d{4}))?[:\s]+\$?([\d,]+\.\d{2})").unwrap()
});
static YTD_INTEREST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:total\s+)?interest\s+(?:charged\s+)?(?:in\s+(\d{4}))?[:\s]+\$?([\d,]+\.\d{2})").unwrap()
});

pub struct GoldmanSachsExtractor {
    tz: Tz,
}

impl Default for GoldmanSachsExtractor {
    fn default() -> Self {
        Self::new(chrono_tz::America::Chicago)
    }
}

impl GoldmanSachsExtractor {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

fn is_page_furniture(lower: &str) -> bool {
    ["date", "transaction", "description", "amount"].iter().any(|p| lower.starts_with(p))
        || lower.contains("page ")
        || lower.contains("continued on")
}

impl StatementExtractor for GoldmanSachsExtractor {
    fn institution(&self) -> InstitutionCode {
        InstitutionCode::GoldmanSachs
    }

    fn extract_transactions(
        &self,
        text: &str,
        statement: &mut Statement,
        account: Option<&Account>,
    ) -> Vec<Transaction> {
        let detected = detect_period(text, &[&PERIOD_MONTH, &PERIOD_SLASH]);
        let period = period_or_fallback(detected, statement, self.tz);
        info!(start = %period.start, end = %period.end, "goldman sachs statement period");

        SummaryPatterns {
            issuer: "goldman_sachs",
            min_payment: Some(&MIN_PAYMENT),
            due_date: Some(&DUE_DATE),
            ytd_fees: Some(&YTD_FEES),
            ytd_interest: Some(&YTD_INTEREST),
        }
        .apply(text, statement, &period);

        let owner = Owner::of(statement, account);
        let mut out = Vec::new();
        for line in lines(text) {
            let lower = line.to_lowercase();
            if is_page_furniture(&lower) {
                continue;
            }
            let Some(m) = ROWS.match_line(line) else {
                continue;
            };
            if is_summary_description(m.desc) {
                continue;
            }
            let (Some(date), Some(amount)) = (period.resolve(m.date), parse_amount(m.amount)) else {
                debug!(line, "goldman sachs: unparseable row");
                continue;
            };

            let upper = m.desc.to_uppercase();
            let ty = if m.amount.starts_with('(')
                || amount.is_sign_negative()
                || contains_any_upper(&upper, &["PAYMENT", "REFUND", "CREDIT", "RETURN"])
            {
                TransactionType::Credit
            } else if lower.contains("interest") {
                TransactionType::Interest
            } else if mentions_fee(&lower) {
                TransactionType::Fee
            } else {
                TransactionType::Debit
            };

            debug!(tier = m.tier, %date, %amount, "goldman sachs row");
            out.push(owner.transaction(date, None, m.desc, m.desc, amount, ty));
        }

        info!(count = out.len(), "goldman sachs extractor done");
        out
    }

    fn extract_account_metadata(&self, text: &str, account: &mut AccountMetadata) {
        fill_if_unset(&mut account.account_type, Some(AccountType::CreditCard));

        if account.last4.is_none() {
            let last4 = capture(&ACCOUNT_LAST4, text, 1).or_else(|| capture(&ACCOUNT_ENDING, text, 1));
            if fill_if_unset(&mut account.last4, last4.map(str::to_string)) {
                debug!(last4 = ?account.last4, "goldman sachs: card number");
            }
        }
        if let Some(balance) = capture(&TOTAL_BALANCE, text, 1).and_then(money) {
            account.current_balance = Some(balance);
        }
        fill_if_unset(&mut account.credit_limit, capture(&CREDIT_LIMIT, text, 1).and_then(money));
        fill_if_unset(&mut account.available_credit, capture(&AVAILABLE_CREDIT, text, 1).and_then(money));

        if account.promo_apr.is_none() {
            if let Some(c) = PROMO_APR.captures(text) {
                if let Some(promo) = percent(&c[1]).filter(|p| *p < Decimal::TEN) {
                    account.promo_apr = Some(promo);
                    fill_if_unset(&mut account.promo_apr_end_date, parse_full_date(&c[2]));
                    debug!(%promo, "goldman sachs: promo apr");
                }
            }
        }
        fill_if_unset(&mut account.apr, capture(&PURCHASE_APR, text, 1).and_then(percent));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::Category;

    const SAMPLE: &str = r#"
Apple Card
Goldman Sachs Bank USA
Card Number •••• •••• •••• 4821
Billing Period Jan 1, 2026 - Jan 31, 2026
Total Balance $1,236.54
Minimum Payment Due $25.00
Payment Due Date Feb 28, 2026
Credit Limit $5,000
Available Credit $3,763.46
Variable APR 26.24%
0.00% intro APR on Apple products through 08/31/2026
Transactions
Date  Description  Amount
Jan 3, 2026    Apple                        $1.29
Jan 12, 2026  Payment                   ($500.00)
Jan 14, 2026    Amazon.com                  $48.25
01/20/2026    UBER EATS                  $23.10
Jan 25, 2026 TRADER JOE S #552 15.62
Jan 28, 2026    Refund AMAZON.COM           $12.00
Jan 31, 2026    Interest Charge on Purchases    $4.12
Page 2 of 3
Fees charged in 2026 $0.00
Interest charged in 2026 $4.12
"#;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn run() -> (Statement, Vec<Transaction>) {
        let mut st = Statement::new("apple-card.pdf");
        let txns = GoldmanSachsExtractor::default().extract_transactions(SAMPLE, &mut st, None);
        (st, txns)
    }

    #[test]
    fn test_parenthesised_payment_is_credit() {
        let (_, txns) = run();
        assert_eq!(txns.len(), 7);
        let payment = &txns[1];
        assert_eq!(payment.transaction_date, d(2026, 1, 12));
        assert_eq!(payment.transaction_type, TransactionType::Credit);
        assert_eq!(payment.amount, Decimal::new(50000, 2));
        assert_eq!(payment.post_date, None);
    }

    #[test]
    fn test_tiers_and_types() {
        let (_, txns) = run();
        assert_eq!(txns[2].category, Some(Category::Shopping));
        // slash_date
        assert_eq!(txns[3].transaction_date, d(2026, 1, 20));
        assert_eq!(txns[3].category, Some(Category::Dining));
        // loose
        assert_eq!(txns[4].merchant_name, "TRADER JOE S #552");
        assert_eq!(txns[4].category, Some(Category::Groceries));
        assert_eq!(txns[5].transaction_type, TransactionType::Credit);
        assert_eq!(txns[6].transaction_type, TransactionType::Interest);
        assert_eq!(txns[6].category, Some(Category::Fees));
    }

    #[test]
    fn test_summary() {
        let (st, _) = run();
        assert_eq!(st.minimum_payment, Some(Decimal::new(2500, 2)));
        assert_eq!(st.payment_due_date, Some(d(2026, 2, 28)));
        assert_eq!(st.ytd_total_fees, Some(Decimal::ZERO));
        assert_eq!(st.ytd_total_interest, Some(Decimal::new(412, 2)));
        assert_eq!(st.ytd_year, Some(2026));
    }

    #[test]
    fn test_account_metadata() {
        let mut meta = AccountMetadata::default();
        GoldmanSachsExtractor::default().extract_account_metadata(SAMPLE, &mut meta);
        assert_eq!(meta.account_type, Some(AccountType::CreditCard));
        assert_eq!(meta.last4.as_deref(), Some("4821"));
        assert_eq!(meta.current_balance, Some(Decimal::new(123654, 2)));
        assert_eq!(meta.credit_limit, Some(Decimal::new(500000, 2)));
        assert_eq!(meta.available_credit, Some(Decimal::new(376346, 2)));
        assert_eq!(meta.apr, Some(Decimal::new(2624, 2)));
        assert_eq!(meta.promo_apr, Some(Decimal::ZERO));
        assert_eq!(meta.promo_apr_end_date, Some(d(2026, 8, 31)));
    }

    #[test]
    fn test_last4_from_ending_in() {
        let mut meta = AccountMetadata::default();
        GoldmanSachsExtractor::default().extract_account_metadata("Apple Card account ending in 0042", &mut meta);
        assert_eq!(meta.last4.as_deref(), Some("0042"));
    }
}
