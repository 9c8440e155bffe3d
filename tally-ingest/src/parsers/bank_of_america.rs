//! Bank of America credit cards (text layer and OCR)
//!
//!   01/02  01/04  AMAZON.COM*AMZN.COM/BILL  WA            45.99
//!   01/10  01/10  ONLINE PAYMENT THANK YOU            -1,500.00
//!
//! Trans and post dates without a year. The transaction type mostly comes
//! from the section the row sits in ("Payments and Other Credits", "Fees
//! Charged", ...). OCR output may use a comma as the decimal mark and may
//! bleed the post date into the description.

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tally_core::{
    Account, AccountMetadata, AccountType, InstitutionCode, Statement, Transaction, TransactionType,
    collapse_whitespace, fill_if_unset,
};
use tracing::{debug, info, warn};

use super::StatementExtractor;
use super::common::{
    Cascade, Owner, Period, Section, SummaryPatterns, capture, detect_period, lines, money,
    parse_amount, parse_full_date, percent, period_from_closing, period_or_fallback, section_after,
    starts_with_date,
};

static ROWS: Lazy<Cascade> = Lazy::new(|| {
    Cascade::new(&[
        (
            "two_date",
            r"^(?P<date>\d{2}/\d{2})\s+(?P<post>\d{2}/\d{2})\s+(?P<desc>.+?)\s+(?P<amount>-?\$?[\d,]+[.,]\d{2})\s*$",
        ),
        (
            "one_date",
            r"^(?P<date>\d{2}/\d{2})\s+(?P<desc>.+?)\s+(?P<amount>-?\$?[\d,]+[.,]\d{2})\s*$",
        ),
    ])
});

static PURCHASES_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bpurchases\b").unwrap());
static CREDITS_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:payments?|credits?)\b").unwrap());
static FEES_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfees?\b").unwrap());
static INTEREST_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\binterest\s+charged\b").unwrap());
static ANY_SHORT_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2}/\d{2}").unwrap());

static REF_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+\d{15,20}\s*$").unwrap());
static LEADING_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}/\d{2}\s+").unwrap());
// " 0317 3266"
static TRAILING_CARD_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\s+\d{4}){1,2}\s*$").unwrap());
// "CHARLOTTE NC", "CHARLOT CHARLOTTE NC", "CA"; two words at most so
// "PATEL BROTHERS" survives
static TRAILING_LOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\s+[A-Z]{3,}){0,2}\s+[A-Z]{2}\s*$").unwrap());
static UPC_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+UPC#?\s*\d+").unwrap());

static MIN_PAYMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:total\s+)?minimum\s+payment\s+due[:\s]+\$?([\d,]+\.\d{2})").unwrap()
});
static DUE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)payment\s+due\s+date[:\s]+(\d{1,2}/\d{1,2}/\d{2,4})").unwrap());
static YTD_FEES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)total\s+fees\s+charged\s+in\s+(\d{4})\s+\$?([\d,]+\.\d{2})").unwrap()
});
static YTD_INTEREST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)total\s+interest\s+charged\s+in\s+(\d{4})\s+\$?([\d,]+\.\d{2})").unwrap()
});

static CREDIT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)total\s+credit\s+line\s+\$?([\d,]+\.\d{2})?").unwrap());
static CREDIT_AVAILABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:total\s+)?credit\s+available\s+\$?([\d,]+\.\d{2})").unwrap()
});
// "New Balance Total $533.56"
static NEW_BALANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)new\s+balance\s+total\s+\$?([\d,]+\.\d{2})").unwrap());
// "Account# 5524 3317 8442 3266"
static ACCOUNT_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)account\s*#?\s+(?:\d{4}\s+){2,3}(\d{4})(?:\s|$)").unwrap()
});
static PURCHASES_APR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpurchases\b[^\n]{0,80}?(\d{1,2}\.\d{2})%").unwrap());
static PROMO_APR_RATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpromotional\b.*?(\d{1,2}\.\d{2})%").unwrap());
static PROMO_APR_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpromotional\b[^\n]*(\d{1,2}/\d{1,2}/\d{4})").unwrap());
static DATE_ANYWHERE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2}/\d{1,2}/\d{4})").unwrap());

static PERIOD_OPENING_CLOSING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)opening.*closing.*?(\d{1,2}/\d{1,2}/\d{2,4})\s+(\d{1,2}/\d{1,2}/\d{2,4})").unwrap()
});
static CLOSING_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)closing\s+date[:\s]+(\d{1,2}/\d{1,2}/\d{2,4})").unwrap());
static PERIOD_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}/\d{1,2}/\d{2,4})\s+(?:through|to|-|–)\s+(\d{1,2}/\d{1,2}/\d{2,4})").unwrap()
});

/// Cycle length assumed when only the closing date is printed.
const CLOSING_ONLY_DAYS: i64 = 30;
/// How far past the promotional rate to look for its expiry date.
const PROMO_DATE_WINDOW: usize = 300;

pub struct BankOfAmericaExtractor {
    tz: Tz,
}

impl Default for BankOfAmericaExtractor {
    fn default() -> Self {
        Self::new(chrono_tz::America::Chicago)
    }
}

impl BankOfAmericaExtractor {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

fn detect(text: &str) -> Option<Period> {
    detect_period(text, &[&PERIOD_OPENING_CLOSING])
        .or_else(|| {
            capture(&CLOSING_DATE, text, 1)
                .and_then(parse_full_date)
                .map(|end| period_from_closing(end, CLOSING_ONLY_DAYS))
        })
        .or_else(|| detect_period(text, &[&PERIOD_RANGE]))
}

/// Section heading on a line that does not start with a date.
fn heading(lower: &str) -> Option<Section> {
    let totals = lower.contains("total");
    if PURCHASES_HEADING.is_match(lower) && !totals {
        Some(Section::Purchases)
    } else if CREDITS_HEADING.is_match(lower) && !totals {
        Some(Section::Payments)
    } else if FEES_HEADING.is_match(lower)
        && !totals
        && !lower.contains("no fee")
        && !lower.contains("annual fee")
    {
        Some(Section::Fees)
    } else if INTEREST_HEADING.is_match(lower) && !ANY_SHORT_DATE.is_match(lower) {
        Some(Section::Interest)
    } else {
        None
    }
}

fn is_column_header(description: &str) -> bool {
    let d = description.to_lowercase();
    matches!(d.as_str(), "description" | "date" | "trans date" | "post date" | "reference" | "amount")
        || [
            "account number",
            "trans  post",
            "please see",
            "continued",
            "activity description",
            "reference number",
        ]
        .iter()
        .any(|p| d.starts_with(p))
}

/// Row description without the trailing reference number or a bled-in
/// post date.
fn clean_description(raw: &str) -> String {
    let d = REF_NUMBER.replace_all(raw.trim(), "");
    LEADING_DATE.replace(d.trim(), "").trim().to_string()
}

/// Strip UPC codes, reference numbers, card digit groups and the
/// `CITY ST` suffix. Location stripping is skipped when it would leave
/// fewer than two characters.
pub fn clean_merchant(description: &str) -> String {
    let name = LEADING_DATE.replace(description.trim(), "");
    let name = UPC_CODE.replace_all(name.trim(), "");
    let name = REF_NUMBER.replace_all(name.trim(), "");
    let name = TRAILING_CARD_DIGITS.replace_all(name.trim(), "");
    let name = name.trim();
    let stripped = TRAILING_LOCATION.replace_all(name, "");
    let stripped = stripped.trim();
    let name = if stripped.chars().count() >= 2 { stripped } else { name };
    let name = collapse_whitespace(name);
    if name.is_empty() { collapse_whitespace(description) } else { name }
}

impl StatementExtractor for BankOfAmericaExtractor {
    fn institution(&self) -> InstitutionCode {
        InstitutionCode::BankOfAmerica
    }

    fn extract_transactions(
        &self,
        text: &str,
        statement: &mut Statement,
        account: Option<&Account>,
    ) -> Vec<Transaction> {
        let period = period_or_fallback(detect(text), statement, self.tz);
        info!(start = %period.start, end = %period.end, "bank of america statement period");

        let owner = Owner::of(statement, account);
        let mut section = Section::Purchases;
        let mut in_section = false;
        let mut zero_rows = 0usize;
        let mut out = Vec::new();

        for line in lines(text) {
            if !starts_with_date(line) {
                if let Some(next) = heading(&line.to_lowercase()) {
                    section = next;
                    in_section = true;
                    continue;
                }
            }

            let Some(m) = ROWS.match_line(line) else {
                continue;
            };
            // Single-date rows only count once a section has started
            if m.post.is_none() && !in_section {
                continue;
            }
            if m.post.is_some() {
                in_section = true;
            }

            let description = clean_description(m.desc);
            if is_column_header(&description) {
                continue;
            }
            let Some(amount) = parse_amount(m.amount) else {
                continue;
            };
            if amount.is_zero() {
                zero_rows += 1;
                continue;
            }
            let Some(date) = period.resolve(m.date) else {
                debug!(line, "bank of america: unparseable date");
                continue;
            };
            let post = m.post.and_then(|p| period.resolve(p));

            let lower = description.to_lowercase();
            let ty = match section {
                Section::Fees => TransactionType::Fee,
                Section::Interest => TransactionType::Interest,
                _ if amount.is_sign_negative()
                    || lower.contains("payment")
                    || lower.contains("credit")
                    || section == Section::Payments =>
                {
                    TransactionType::Credit
                }
                _ => TransactionType::Debit,
            };

            let merchant = clean_merchant(&description);
            debug!(tier = m.tier, %date, merchant, %amount, "bank of america row");
            out.push(owner.transaction(date, post, &description, &merchant, amount, ty));
        }

        SummaryPatterns {
            issuer: "bank_of_america",
            min_payment: Some(&MIN_PAYMENT),
            due_date: Some(&DUE_DATE),
            ytd_fees: Some(&YTD_FEES),
            ytd_interest: Some(&YTD_INTEREST),
        }
        .apply(text, statement, &period);

        if zero_rows > 0 {
            debug!(zero_rows, "bank of america: dropped zero-amount rows");
        }
        if out.is_empty() {
            warn!("bank of america extractor found no rows");
        }
        info!(count = out.len(), "bank of america extractor done");
        out
    }

    fn extract_account_metadata(&self, text: &str, account: &mut AccountMetadata) {
        let section = section_after(text, "interest charge calculation", 2000);

        if fill_if_unset(&mut account.apr, capture(&PURCHASES_APR, section, 1).and_then(percent)) {
            debug!(apr = ?account.apr, "bank of america: purchases apr");
        }

        let promo = PROMO_APR_RATE.captures(section);
        if account.promo_apr.is_none() {
            let rate = promo
                .as_ref()
                .and_then(|c| percent(&c[1]))
                .filter(|p| *p < Decimal::TEN);
            fill_if_unset(&mut account.promo_apr, rate);
        }
        if account.promo_apr_end_date.is_none() {
            let same_line = capture(&PROMO_APR_DATE, section, 1).and_then(parse_full_date);
            let nearby = || {
                let end = promo.as_ref()?.get(0)?.end();
                capture(&DATE_ANYWHERE, window(&section[end..], PROMO_DATE_WINDOW), 1)
                    .and_then(parse_full_date)
            };
            fill_if_unset(&mut account.promo_apr_end_date, same_line.or_else(nearby));
        }

        if let Some(c) = CREDIT_LINE.captures(text) {
            fill_if_unset(&mut account.account_type, Some(AccountType::CreditCard));
            fill_if_unset(&mut account.credit_limit, c.get(1).and_then(|m| money(m.as_str())));
        }
        fill_if_unset(&mut account.available_credit, capture(&CREDIT_AVAILABLE, text, 1).and_then(money));
        if let Some(balance) = capture(&NEW_BALANCE, text, 1).and_then(money) {
            account.current_balance = Some(balance);
        }
        fill_if_unset(&mut account.last4, capture(&ACCOUNT_NUMBER, text, 1).map(str::to_string));
    }
}

/// At most `len` bytes from the start of `s`, cut on a char boundary.
fn window(s: &str, len: usize) -> &str {
    let mut end = len.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
