//! Citi cards
//!
//!   01/12   01/14   PAYMENT THANK YOU                          -500.00
//!   01/17   01/18   TRADER JOE'S #552  AUSTIN TX                84.21
//!
//! Trans date then post date, no year, no `$`; negative means credit. Citi
//! layouts often lack reliable section headers, so every line is tried.

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
            r"^(?P<date>\d{2}/\d{2})\s+(?P<post>\d{2}/\d{2})\s+(?P<desc>.+?)\s{2,}(?P<amount>-?[\d,]+\.\d{2})\s*$",
        ),
        (
            "one_date",
            r"^(?P<date>\d{2}/\d{2})\s{2,}(?P<desc>.+?)\s{2,}(?P<amount>-?[\d,]+\.\d{2})\s*$",
        ),
        (
            "loose",
            r"^(?P<date>\d{2}/\d{2})\s+(?P<desc>.+?)\s+(?P<amount>-?[\d,]+\.\d{2})\s*$",
        ),
    ])
});

const HEADINGS: &[&str] = &[
    "purchases and adjustments",
    "standard purchases",
    "account activity",
    "transaction detail",
    "new charges",
    "payments and credits",
];

static PERIOD_LABELLED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?:statement\s+period|billing\s+period)[:\s]+(\d{1,2}/\d{1,2}/\d{2,4})",
        r"\s+(?:to|through|[-–])\s+(\d{1,2}/\d{1,2}/\d{2,4})"
    ))
    .unwrap()
});
// "01/16/2025 through 02/15/2025"
static PERIOD_BARE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}/\d{1,2}/\d{2,4})\s+(?:through|to)\s+(\d{1,2}/\d{1,2}/\d{2,4})").unwrap()
});

static ACCOUNT_LAST4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:account\s+(?:number\s+)?ending\s+in|card\s+ending(?:\s+in)?)\s+(\d{4})").unwrap()
});
static NEW_BALANCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^(?:total\s+)?new\s+balance\s+\$?([\d,]+\.\d{2})\s*$").unwrap()
});
static CREDIT_LIMIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:credit\s+line|credit\s+limit)\s+\$?([\d,]+(?:\.\d{2})?)").unwrap()
});
static AVAILABLE_CREDIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)available\s+credit\s+\$?([\d,]+(?:\.\d{2})?)").unwrap());
static MIN_PAYMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)minimum\s+payment\s+due\s+\$?([\d,]+\.\d{2})").unwrap());
static DUE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)payment\s+due\s+date[:\s]+(\d{1,2}/\d{1,2}/\d{2,4})").unwrap());
// "Variable APR  28.49%" or "Purchase APR  28.49%"
static PURCHASE_APR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:variable\s+|purchase\s+)?(?:purchase\s+)?apr[:\s]+(\d{1,2}\.\d{2})%").unwrap()
});
// "Promotional APR  0.00%  Expires MM/DD/YYYY"
static PROMO_APR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:promotional\s+|intro(?:ductory)?\s+)?apr\s+(\d{1,2}\.\d{2})%[^\n]*(\d{1,2}/\d{1,2}/\d{2,4})",
    )
    .unwrap()
});
static YTD_FEES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)total\s+fees\s+charged\s+in\s+(\d{4})\s+\$?([\d,]+\.\d{2})").unwrap()
});
static YTD_INTEREST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)total\s+interest\s+charged\s+in\s+(\d{4})\s+\$?([\d,]+\.\d{2})").unwrap()
});

pub struct CitiExtractor {
    tz: Tz,
}

impl Default for CitiExtractor {
    fn default() -> Self {
        Self::new(chrono_tz::America::Chicago)
    }
}

impl CitiExtractor {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl StatementExtractor for CitiExtractor {
    fn institution(&self) -> InstitutionCode {
        InstitutionCode::Citi
    }

    fn extract_transactions(
        &self,
        text: &str,
        statement: &mut Statement,
        account: Option<&Account>,
    ) -> Vec<Transaction> {
        let detected = detect_period(text, &[&PERIOD_LABELLED, &PERIOD_BARE]);
        let period = period_or_fallback(detected, statement, self.tz);
        info!(start = %period.start, end = %period.end, "citi statement period");

        SummaryPatterns {
            issuer: "citi",
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
                debug!(line, "citi: unparseable row");
                continue;
            };
            let post = m.post.and_then(|p| period.resolve(p));

            let upper = m.desc.to_uppercase();
            let ty = if amount.is_sign_negative()
                || contains_any_upper(&upper, &["PAYMENT", "AUTOPAY", "CREDIT ADJUSTMENT"])
            {
                TransactionType::Credit
            } else if lower.contains("interest charge") {
                TransactionType::Interest
            } else if mentions_fee(&lower) {
                TransactionType::Fee
            } else {
                TransactionType::Debit
            };

            debug!(tier = m.tier, %date, %amount, "citi row");
            out.push(owner.transaction(date, post, m.desc, m.desc, amount, ty));
        }

        info!(count = out.len(), "citi extractor done");
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

        if account.promo_apr.is_none() {
            if let Some(c) = PROMO_APR.captures(text) {
                if let Some(promo) = percent(&c[1]).filter(|p| *p < Decimal::TEN) {
                    account.promo_apr = Some(promo);
                    fill_if_unset(&mut account.promo_apr_end_date, parse_full_date(&c[2]));
                    debug!(%promo, "citi: promo apr");
                }
            }
        }

        let regular = PURCHASE_APR
            .captures_iter(text)
            .filter_map(|c| percent(&c[1]))
            .filter(|apr| *apr > Decimal::from(5))
            .last();
        fill_if_unset(&mut account.apr, regular);
    }
}
