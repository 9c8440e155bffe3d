//! Chase credit card and checking statements
//!
//! Card rows carry no year and no `$`; a minus sign marks payments:
//!   Date of
//!   Transaction  Merchant Name or Transaction Description  $ Amount
//!   02/12     AUTOMATIC PAYMENT - THANK YOU -40.00
//!   01/15     AMAZON.COM*1A2B3C4D5  SEATTLE WA  23.45
//!
//! Checking statements list a running balance after the amount:
//!   TRANSACTION DETAIL
//!          DATE        DESCRIPTION                                     AMOUNT     BALANCE
//!          04/22       Discover     E-Payment 8148   Web ID: ...       -15.00      53.70
//!
//! Only lines between an activity heading and the year-end totals block are
//! considered.

use chrono::Duration;
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
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

static CARD_ROWS: Lazy<Cascade> = Lazy::new(|| {
    Cascade::new(&[
        (
            "strict",
            r"^(?P<date>\d{2}/\d{2})\s{2,}(?P<desc>.+?)\s{2,}(?P<amount>-?[\d,]+\.\d{2})\s*$",
        ),
        (
            "loose",
            r"^(?P<date>\d{2}/\d{2})\s+(?P<desc>.+?)\s+(?P<amount>-?[\d,]+\.\d{2})\s*$",
        ),
    ])
});

// DATE DESCRIPTION AMOUNT BALANCE
static CHECKING_ROWS: Lazy<Cascade> = Lazy::new(|| {
    Cascade::new(&[(
        "checking",
        concat!(
            r"^(?P<date>\d{2}/\d{2})\s+",
            r"(?P<desc>.+?)\s+",
            r"(?P<amount>-?[\d,]+\.\d{2})\s+",
            r"[\d,]+\.\d{2}\s*$"
        ),
    )])
});

static OPENING_CLOSING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)opening/closing\s+date\s+(\d{1,2}/\d{1,2}/\d{2,4})\s*[-–]\s*(\d{1,2}/\d{1,2}/\d{2,4})")
        .unwrap()
});
// "2026 Totals Year-to-Date"
static YEAR_TOTALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}\s+totals").unwrap());

static MIN_PAYMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)minimum\s+payment\s+due.*?\$?([\d,]+\.\d{2})").unwrap());
static DUE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)payment\s+due\s+date.*?(\d{1,2}/\d{1,2}/\d{2,4})").unwrap());
static YTD_FEES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)total\s+fees\s+charged\s+in\s+(\d{4})\s+\$?([\d,]+\.\d{2})").unwrap()
});
static YTD_INTEREST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)total\s+interest\s+charged\s+in\s+(\d{4})\s+\$?([\d,]+\.\d{2})").unwrap()
});

static ACCOUNT_LAST4: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)account\s+number:\s+(?:X{4}\s+){3}(\d{4})").unwrap());
static NEW_BALANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^new\s+balance\s+\$?([\d,]+\.\d{2})\s*$").unwrap());
static CREDIT_LIMIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:credit\s+limit|credit\s+access\s+line)\s+\$?([\d,]+(?:\.\d{2})?)").unwrap()
});
// OCR sometimes puts a stray glyph between the "A" and "vailable"
static AVAILABLE_CREDIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)a\W?vailable\s+(?:credit|for\s+purchase)\s+\$?([\d,]+(?:\.\d{2})?)").unwrap()
});
static REGULAR_APR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^purchases\s+(\d{1,2}\.\d{2})%").unwrap());
static PROMO_APR_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^purchases\s+(\d{1,2}\.\d{2})%[^\n]*(\d{2}/\d{2}/\d{2,4})").unwrap()
});

/// Days from closing to due date when the statement only prints the due
/// date in a layer the text extractor cannot see.
const INFERRED_DUE_DAYS: i64 = 28;

pub struct ChaseExtractor {
    tz: Tz,
}

impl Default for ChaseExtractor {
    fn default() -> Self {
        Self::new(chrono_tz::America::Chicago)
    }
}

impl ChaseExtractor {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

fn enters_activity(lower: &str) -> bool {
    ["date of", "transaction merchant", "account activity", "transaction detail"]
        .iter()
        .any(|h| lower.contains(h))
}

fn leaves_activity(lower: &str) -> bool {
    YEAR_TOTALS.is_match(lower)
        || ["totals year", "total fees", "total interest", "your annual percentage"]
            .iter()
            .any(|h| lower.starts_with(h))
}

fn card_type(desc: &str, lower_line: &str, negative: bool) -> TransactionType {
    let upper = desc.to_uppercase();
    if negative || contains_any_upper(&upper, &["PAYMENT", "AUTOPAY"]) {
        TransactionType::Credit
    } else if lower_line.contains("interest") {
        TransactionType::Interest
    } else if mentions_fee(lower_line) {
        TransactionType::Fee
    } else {
        TransactionType::Debit
    }
}

impl StatementExtractor for ChaseExtractor {
    fn institution(&self) -> InstitutionCode {
        InstitutionCode::Chase
    }

    fn extract_transactions(
        &self,
        text: &str,
        statement: &mut Statement,
        account: Option<&Account>,
    ) -> Vec<Transaction> {
        let period = period_or_fallback(detect_period(text, &[&OPENING_CLOSING]), statement, self.tz);
        info!(start = %period.start, end = %period.end, "chase statement period");

        SummaryPatterns {
            issuer: "chase",
            min_payment: Some(&MIN_PAYMENT),
            due_date: Some(&DUE_DATE),
            ytd_fees: Some(&YTD_FEES),
            ytd_interest: Some(&YTD_INTEREST),
        }
        .apply(text, statement, &period);

        let inferred = period.end + Duration::days(INFERRED_DUE_DAYS);
        if fill_if_unset(&mut statement.payment_due_date, Some(inferred)) {
            debug!(due = %inferred, "chase: inferred due date from closing date");
        }

        let owner = Owner::of(statement, account);
        let mut in_activity = false;
        let mut checking = false;
        let mut out = Vec::new();

        for line in lines(text) {
            let lower = line.to_lowercase();
            if enters_activity(&lower) {
                in_activity = true;
                checking = lower.contains("transaction detail");
                continue;
            }
            if leaves_activity(&lower) {
                in_activity = false;
            }
            if !in_activity {
                continue;
            }

            let row = if checking {
                CHECKING_ROWS.match_line(line).or_else(|| CARD_ROWS.match_line(line))
            } else {
                CARD_ROWS.match_line(line)
            };
            let Some(m) = row else {
                continue;
            };
            if is_summary_description(m.desc) {
                continue;
            }
            let (Some(date), Some(amount)) = (period.resolve(m.date), parse_amount(m.amount)) else {
                debug!(line, "chase: unparseable row");
                continue;
            };

            let ty = if m.tier == "checking" {
                // Checking amounts are signed from the holder's side
                if amount.is_sign_negative() {
                    TransactionType::Debit
                } else {
                    TransactionType::Credit
                }
            } else {
                card_type(m.desc, &lower, amount.is_sign_negative())
            };

            debug!(tier = m.tier, %date, %amount, "chase row");
            out.push(owner.transaction(date, None, m.desc, m.desc, amount, ty));
        }

        info!(count = out.len(), "chase extractor done");
        out
    }

    fn extract_account_metadata(&self, text: &str, account: &mut AccountMetadata) {
        let kind = if text.to_lowercase().contains("checking summary") {
            AccountType::Checking
        } else {
            AccountType::CreditCard
        };
        fill_if_unset(&mut account.account_type, Some(kind));

        fill_if_unset(&mut account.last4, capture(&ACCOUNT_LAST4, text, 1).map(str::to_string));
        if let Some(balance) = capture(&NEW_BALANCE, text, 1).and_then(money) {
            account.current_balance = Some(balance);
        }
        fill_if_unset(&mut account.credit_limit, capture(&CREDIT_LIMIT, text, 1).and_then(money));
        fill_if_unset(&mut account.available_credit, capture(&AVAILABLE_CREDIT, text, 1).and_then(money));

        if account.promo_apr.is_none() {
            if let Some(c) = PROMO_APR_ROW.captures(text) {
                if let Some(promo) = percent(&c[1]).filter(|p| *p < rust_decimal::Decimal::TEN) {
                    account.promo_apr = Some(promo);
                    fill_if_unset(&mut account.promo_apr_end_date, parse_full_date(&c[2]));
                    debug!(%promo, expires = ?account.promo_apr_end_date, "chase: promo apr");
                }
            }
        }

        // Several "Purchases" rows may be listed; the last non-promotional one
        // is the standing rate.
        let regular = REGULAR_APR
            .captures_iter(text)
            .filter_map(|c| percent(&c[1]))
            .filter(|apr| *apr > rust_decimal::Decimal::from(5))
            .last();
        fill_if_unset(&mut account.apr, regular);
    }
}
