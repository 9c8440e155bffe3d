//! Capital One cards
//!
//! Current layout (month-name trans and post dates, no year):
//!   Feb 14 Feb 14 AMAZON MKTPL*AB12C $10.70
//!   Feb 10 Feb 11 CAPITAL ONE AUTOPAY PYMT - $63.00
//!
//! Older exports print the year, either `Jan. 15, 2026` or `01/15/2026`,
//! with column gaps of two or more spaces.

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
            "two_dates",
            concat!(
                r"^(?P<date>[A-Z][a-z]{2}\s+\d{1,2})\s+(?P<post>[A-Z][a-z]{2}\s+\d{1,2})\s+",
                r"(?P<desc>.+?)\s+(?P<amount>-\s*\$[\d,]+\.\d{2}|\$[\d,]+\.\d{2})\s*$"
            ),
        ),
        (
            "full_date",
            r"^(?P<date>[A-Z][a-z]{2}\.?\s+\d{1,2},\s+\d{4})\s{2,}(?P<desc>.+?)\s{2,}(?P<amount>-?\$?[\d,]+\.\d{2})\s*$",
        ),
        (
            "slash_date",
            r"^(?P<date>\d{1,2}/\d{1,2}/\d{2,4})\s{2,}(?P<desc>.+?)\s{2,}(?P<amount>-?\$?[\d,]+\.\d{2})\s*$",
        ),
        (
            "loose",
            r"^(?P<date>[A-Z][a-z]{2}\.?\s+\d{1,2},\s+\d{4})\s+(?P<desc>.+?)\s+(?P<amount>-?\$?[\d,]+\.\d{2})\s*$",
        ),
    ])
});

const SKIP_PREFIXES: &[&str] = &["trans date", "post date", "date", "description"];
const SKIP_CONTAINING: &[&str] = &[
    "page ",
    "continued",
    "total fees",
    "total interest",
    "interest charge on",
    "year-to-date",
    "total transactions",
];

static PERIOD_SLASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?:billing\s+period|statement\s+period)[:\s]+(\d{1,2}/\d{1,2}/\d{2,4})",
        r"\s*[-–]\s*(\d{1,2}/\d{1,2}/\d{2,4})"
    ))
    .unwrap()
});
static PERIOD_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?:billing\s+period|statement\s+period)[:\s]+([A-Z][a-z]{2}\.?\s+\d{1,2},\s+\d{4})",
        r"\s*[-–]\s*([A-Z][a-z]{2}\.?\s+\d{1,2},\s+\d{4})"
    ))
    .unwrap()
});
// "Jan 21, 2026 - Feb 17, 2026   |  28 days in Billing Cycle"
static PERIOD_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][a-z]{2}\s+\d{1,2},\s+\d{4})\s*[-–]\s*([A-Z][a-z]{2}\s+\d{1,2},\s+\d{4})\s*\|")
        .unwrap()
});

static ACCOUNT_LAST4: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:account|card)\s+ending\s+(?:in\s+)?(\d{4})").unwrap());
static NEW_BALANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^new\s+balance\s+\$?([\d,]+\.\d{2})\s*$").unwrap());
static CREDIT_LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)credit\s+limit[:\s]+\$?([\d,]+(?:\.\d{2})?)").unwrap());
static AVAILABLE_CREDIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)available\s+credit[:\s]+\$?([\d,]+(?:\.\d{2})?)").unwrap());
static MIN_PAYMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)minimum\s+payment\s+due[:\s]+\$?([\d,]+\.\d{2})").unwrap());
static DUE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)payment\s+due\s+(?:date)?[:\s]+(\d{1,2}/\d{1,2}/\d{2,4})").unwrap()
});
static PURCHASE_APR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:variable\s+)?purchase\s+apr[:\s]+(\d{1,2}\.\d{2})%").unwrap());
// "0.00% intro APR through 09/30/2026"
static PROMO_APR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2}\.\d{2})%\s+intro(?:ductory)?\s+apr[^\n]*(\d{1,2}/\d{1,2}/\d{2,4})").unwrap()
});
static YTD_FEES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:total\s+)?fees\s+(?:charged\s+)?in\s+(\d{4})[:\s]+\$?([\d,]+\.\d{2})").unwrap()
});
static YTD_INTEREST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:total\s+)?interest\s+(?:charged\s+)?in\s+(\d{4})[:\s]+\$?([\d,]+\.\d{2})").unwrap()
});

pub struct CapitalOneExtractor {
    tz: Tz,
}

impl Default for CapitalOneExtractor {
    fn default() -> Self {
        Self::new(chrono_tz::America::Chicago)
    }
}

impl CapitalOneExtractor {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

fn is_noise(lower: &str) -> bool {
    SKIP_PREFIXES.iter().any(|p| lower.starts_with(p)) || SKIP_CONTAINING.iter().any(|p| lower.contains(p))
}

impl StatementExtractor for CapitalOneExtractor {
    fn institution(&self) -> InstitutionCode {
        InstitutionCode::CapitalOne
    }

    fn extract_transactions(
        &self,
        text: &str,
        statement: &mut Statement,
        account: Option<&Account>,
    ) -> Vec<Transaction> {
        let detected = detect_period(text, &[&PERIOD_SLASH, &PERIOD_MONTH, &PERIOD_HEADER]);
        let period = period_or_fallback(detected, statement, self.tz);
        info!(start = %period.start, end = %period.end, "capital one statement period");

        SummaryPatterns {
            issuer: "capital_one",
            min_payment: Some(&MIN_PAYMENT),
            due_date: Some(&DUE_DATE),
            ytd_fees: Some(&YTD_FEES),
            ytd_interest: Some(&YTD_INTEREST),
        }
        .apply(text, statement, &period);

        let owner = Owner::of(statement, account);
        let mut out = Vec::new();
        for line in lines(text) {
            if is_noise(&line.to_lowercase()) {
                continue;
            }
            let Some(m) = ROWS.match_line(line) else {
                continue;
            };
            if is_summary_description(m.desc) {
                continue;
            }
            let (Some(date), Some(amount)) = (period.resolve(m.date), parse_amount(m.amount)) else {
                debug!(line, "capital one: unparseable row");
                continue;
            };
            let post = m.post.and_then(|p| period.resolve(p));

            let upper = m.desc.to_uppercase();
            let ty = if amount.is_sign_negative()
                || contains_any_upper(&upper, &["PAYMENT", "AUTOPAY", "CREDIT ADJUSTMENT", "REFUND"])
            {
                TransactionType::Credit
            } else if upper.contains("INTEREST CHARGE") {
                TransactionType::Interest
            } else if mentions_fee(m.desc) {
                TransactionType::Fee
            } else {
                TransactionType::Debit
            };

            debug!(tier = m.tier, %date, %amount, "capital one row");
            out.push(owner.transaction(date, post, m.desc, m.desc, amount, ty));
        }

        info!(count = out.len(), "capital one extractor done");
        out
    }

    fn extract_account_metadata(&self, text: &str, account: &mut AccountMetadata) {
        fill_if_unset(&mut account.account_type, Some(AccountType::CreditCard));
        fill_if_unset(&mut account.last4, capture(&ACCOUNT_LAST4, text, 1).map(str::to_string));
        if let Some(balance) = capture(&NEW_BALANCE, text, 1).and_then(money) {
            account.current_balance = Some(balance);
        }
        fill_if_unset(&mut account.credit_limit, capture(&CREDIT_LIMIT, text, 1).and_then(money));
        fill_if_unset(&mut account.available_credit, capture(&AVAILABLE_CREDIT, text, 1).and_then(money));
        fill_if_unset(&mut account.apr, capture(&PURCHASE_APR, text, 1).and_then(percent));

        if account.promo_apr.is_none() {
            if let Some(c) = PROMO_APR.captures(text) {
                if let Some(promo) = percent(&c[1]).filter(|p| *p < Decimal::TEN) {
                    account.promo_apr = Some(promo);
                    fill_if_unset(&mut account.promo_apr_end_date, parse_full_date(&c[2]));
                    debug!(%promo, "capital one: promo apr");
                }
            }
        }
    }
}
