//! Discover cards
//!
//!   01/10/2026 01/11/2026 DIRECTPAY FULL BALANCE      -$512.00
//!   01/15/2026  CASHBACK BONUS REDEMPTION PYMT/STMT CRDT  10.00
//!
//! Dates carry the year. Cashback redemptions post as positive amounts but
//! are credits.

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
            "two_date",
            concat!(
                r"^(?P<date>\d{2}/\d{2}/\d{2,4})\s+(?P<post>\d{2}/\d{2}/\d{2,4})\s+",
                r"(?P<desc>.+?)\s{2,}(?P<amount>-?\$?[\d,]+\.\d{2})\s*$"
            ),
        ),
        (
            "one_date",
            r"^(?P<date>\d{2}/\d{2}/\d{2,4})\s{2,}(?P<desc>.+?)\s{2,}(?P<amount>-?\$?[\d,]+\.\d{2})\s*$",
        ),
        (
            "loose",
            r"^(?P<date>\d{2}/\d{2}/\d{2,4})\s+(?P<desc>.+?)\s+(?P<amount>-?\$?[\d,]+\.\d{2})\s*$",
        ),
    ])
});

const HEADINGS: &[&str] = &[
    "transaction description",
    "account activity",
    "purchases and cash advances",
    "new transactions",
    "payments and credits",
];

// "Open Date: 01/08/2026   Close Date: 02/07/2026"
static PERIOD_OPEN_CLOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?:opening|open)\s+date[:\s]+(\d{1,2}/\d{1,2}/\d{2,4})[^\n]*",
        r"(?:closing|close)\s+date[:\s]+(\d{1,2}/\d{1,2}/\d{2,4})"
    ))
    .unwrap()
});
static PERIOD_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?:statement\s+period|billing\s+period|closing\s+date)[:\s]+(\d{1,2}/\d{1,2}/\d{2,4})",
        r"\s*[-–]\s*(\d{1,2}/\d{1,2}/\d{2,4})"
    ))
    .unwrap()
});

static ACCOUNT_LAST4: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:account|card)\s+ending\s+(?:in\s+)?(\d{4})").unwrap());
static NEW_BALANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^new\s+balance\s+\$?([\d,]+\.\d{2})\s*$").unwrap());
static CREDIT_LIMIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:credit\s+limit|total\s+credit\s+line|credit\s+line)[:\s]+\$?([\d,]+(?:\.\d{2})?)")
        .unwrap()
});
static AVAILABLE_CREDIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)available\s+credit[:\s]+\$?([\d,]+(?:\.\d{2})?)").unwrap());
static CASHBACK_BALANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)cashback\s+bonus\s+balance[:\s]+\$?([\d,]+\.\d{2})").unwrap());
static MIN_PAYMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)minimum\s+payment\s+due[:\s]+\$?([\d,]+\.\d{2})").unwrap());
static DUE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)payment\s+due\s+date[:\s]+(\d{1,2}/\d{1,2}/\d{2,4})").unwrap());
static PURCHASE_APR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)purchase\s+apr[:\s]+(\d{1,2}\.\d{2})%").unwrap());
// "0.00%  Intro APR  through  MM/DD/YYYY"
static PROMO_APR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2}\.\d{2})%\s+(?:intro(?:ductory)?\s+)?apr[^\n]*(\d{1,2}/\d{1,2}/\d{2,4})").unwrap()
});
static YTD_FEES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:total\s+)?fees\s+charged\s+(?:in\s+(\d{4}))?[:\s]+\$?([\d,]+\.\d{2})").unwrap()
});
static YTD_INTEREST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:total\s+)?interest\s+charged\s+(?:in\s+(\d{4}))?[:\s]+\$?([\d,]+\.\d{2})").unwrap()
});

pub struct DiscoverExtractor {
    tz: Tz,
}

impl Default for DiscoverExtractor {
    fn default() -> Self {
        Self::new(chrono_tz::America::Chicago)
    }
}

impl DiscoverExtractor {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl StatementExtractor for DiscoverExtractor {
    fn institution(&self) -> InstitutionCode {
        InstitutionCode::Discover
    }

    fn extract_transactions(
        &self,
        text: &str,
        statement: &mut Statement,
        account: Option<&Account>,
    ) -> Vec<Transaction> {
        let detected = detect_period(text, &[&PERIOD_OPEN_CLOSE, &PERIOD_RANGE]);
        let period = period_or_fallback(detected, statement, self.tz);
        info!(start = %period.start, end = %period.end, "discover statement period");

        SummaryPatterns {
            issuer: "discover",
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
            if HEADINGS.iter().any(|h| lower.contains(h)) {
                continue;
            }
            let Some(m) = ROWS.match_line(line) else {
                continue;
            };
            if is_summary_description(m.desc) {
                continue;
            }
            let (Some(date), Some(amount)) = (period.resolve(m.date), parse_amount(m.amount)) else {
                debug!(line, "discover: unparseable row");
                continue;
            };
            let post = m.post.and_then(|p| period.resolve(p));

            let upper = m.desc.to_uppercase();
            let ty = if amount.is_sign_negative()
                || contains_any_upper(&upper, &["PAYMENT", "CREDIT ADJUSTMENT", "CASHBACK BONUS"])
            {
                TransactionType::Credit
            } else if lower.contains("interest charge") {
                TransactionType::Interest
            } else if mentions_fee(&lower) {
                TransactionType::Fee
            } else {
                TransactionType::Debit
            };

            debug!(tier = m.tier, %date, %amount, "discover row");
            out.push(owner.transaction(date, post, m.desc, m.desc, amount, ty));
        }

        info!(count = out.len(), "discover extractor done");
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
        if let Some(cashback) = capture(&CASHBACK_BALANCE, text, 1) {
            // Not tracked on the account; useful when reading logs
            debug!(cashback, "discover: cashback bonus balance");
        }

        if account.promo_apr.is_none() {
            if let Some(c) = PROMO_APR.captures(text) {
                if let Some(promo) = percent(&c[1]).filter(|p| *p < Decimal::TEN) {
                    account.promo_apr = Some(promo);
                    fill_if_unset(&mut account.promo_apr_end_date, parse_full_date(&c[2]));
                    debug!(%promo, "discover: promo apr");
                }
            }
        }
        fill_if_unset(&mut account.apr, capture(&PURCHASE_APR, text, 1).and_then(percent));
    }
}
