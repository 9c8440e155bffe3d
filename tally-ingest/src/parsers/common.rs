//! Building blocks shared by the issuer extractors: line cascades, date and
//! amount parsing, period detection and fill-if-unset metadata helpers.

use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tally_core::{
    Account, Statement, Transaction, TransactionType, categorize, collapse_whitespace,
    fill_if_unset, normalize_merchant, time,
};
use tracing::debug;
use uuid::Uuid;

/// One rung of a per-issuer line grammar.
///
/// Patterns use named groups: `date`, `desc` and `amount` are required,
/// `post` is optional.
pub struct Tier {
    pub name: &'static str,
    re: Regex,
}

/// Ordered tiers, most specific first. The first full-line match wins.
pub struct Cascade {
    tiers: Vec<Tier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMatch<'t> {
    pub tier: &'static str,
    pub date: &'t str,
    pub post: Option<&'t str>,
    pub desc: &'t str,
    pub amount: &'t str,
}

impl Cascade {
    /// Panics on an invalid pattern; every cascade is built from literals
    /// and compiled by the unit tests.
    pub fn new(tiers: &[(&'static str, &str)]) -> Self {
        let tiers = tiers
            .iter()
            .map(|&(name, pattern)| Tier {
                name,
                re: Regex::new(pattern).unwrap_or_else(|e| panic!("tier {name}: {e}")),
            })
            .collect();
        Self { tiers }
    }

    pub fn match_line<'t>(&self, line: &'t str) -> Option<LineMatch<'t>> {
        self.tiers.iter().find_map(|tier| {
            let caps = tier.re.captures(line)?;
            Some(LineMatch {
                tier: tier.name,
                date: caps.name("date")?.as_str(),
                post: caps.name("post").map(|m| m.as_str()),
                desc: caps.name("desc")?.as_str().trim(),
                amount: caps.name("amount")?.as_str(),
            })
        })
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name).collect()
    }
}

/// Transaction-type context carried across non-transaction lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Unknown,
    Purchases,
    Payments,
    Fees,
    Interest,
}

static LEADING_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{1,2}/\d{1,2}|(?i:(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*)\.?\s+\d{1,2}\b)")
        .unwrap()
});

/// A line that starts with a date is a transaction candidate and never a
/// section heading.
pub fn starts_with_date(line: &str) -> bool {
    LEADING_DATE.is_match(line)
}

/// Trimmed, non-blank lines.
pub fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty())
}

/// Column headers and summary rows that the loose tiers can mistake for
/// transactions.
pub fn is_summary_description(desc: &str) -> bool {
    let lower = desc.to_lowercase();
    lower == "description"
        || lower == "amount"
        || lower.starts_with("total ")
        || lower.starts_with("new balance")
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateToken {
    Full(NaiveDate),
    /// No year printed; resolved against the statement period.
    MonthDay(u32, u32),
}

static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{2}|\d{4}))?$").unwrap());
static NAMED_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]{3,9})\.?\s+(\d{1,2})(?:,?\s*(\d{4}))?$").unwrap()
});
static DAY_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\s+([A-Za-z]{3,9})\s+(\d{4})$").unwrap());
static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());

pub fn month_from_name(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn full_year(raw: &str) -> Option<i32> {
    let y: i32 = raw.parse().ok()?;
    Some(if y < 100 { y + 2000 } else { y })
}

/// Recognise the date spellings issuers print: `01/15/26`, `1/5/2026`,
/// `01/15`, `Jan 15, 2026`, `Jan. 15 2026`, `January 15`, `15 Jan 2026`,
/// `2026-01-15`.
pub fn parse_date_token(raw: &str) -> Option<DateToken> {
    let s = raw.trim();
    if let Some(c) = SLASH_DATE.captures(s) {
        let month: u32 = c[1].parse().ok()?;
        let day: u32 = c[2].parse().ok()?;
        return match c.get(3) {
            Some(y) => NaiveDate::from_ymd_opt(full_year(y.as_str())?, month, day).map(DateToken::Full),
            None => valid_month_day(month, day),
        };
    }
    if let Some(c) = NAMED_DATE.captures(s) {
        let month = month_from_name(&c[1])?;
        let day: u32 = c[2].parse().ok()?;
        return match c.get(3) {
            Some(y) => NaiveDate::from_ymd_opt(full_year(y.as_str())?, month, day).map(DateToken::Full),
            None => valid_month_day(month, day),
        };
    }
    if let Some(c) = DAY_MONTH_YEAR.captures(s) {
        let month = month_from_name(&c[2])?;
        return NaiveDate::from_ymd_opt(c[3].parse().ok()?, month, c[1].parse().ok()?)
            .map(DateToken::Full);
    }
    if let Some(c) = ISO_DATE.captures(s) {
        return NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?)
            .map(DateToken::Full);
    }
    None
}

fn valid_month_day(month: u32, day: u32) -> Option<DateToken> {
    // 2024 is a leap year, so Feb 29 is accepted here and rejected later if
    // the resolved year has no such day.
    NaiveDate::from_ymd_opt(2024, month, day).map(|_| DateToken::MonthDay(month, day))
}

/// A date that must carry its own year.
pub fn parse_full_date(raw: &str) -> Option<NaiveDate> {
    match parse_date_token(raw)? {
        DateToken::Full(d) => Some(d),
        DateToken::MonthDay(..) => None,
    }
}

/// Billing cycle used to give yearless dates a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        d >= self.start && d <= self.end
    }

    /// Use the closing year; if that lands after the close, try the year
    /// before and keep it when it is not before the opening date
    /// (December rows on a January statement).
    pub fn resolve_month_day(&self, month: u32, day: u32) -> Option<NaiveDate> {
        let year = self.end.year();
        let candidate = NaiveDate::from_ymd_opt(year, month, day);
        if candidate.is_none_or(|c| c > self.end) {
            if let Some(prev) = NaiveDate::from_ymd_opt(year - 1, month, day) {
                if prev >= self.start {
                    return Some(prev);
                }
            }
        }
        candidate
    }

    pub fn resolve(&self, raw: &str) -> Option<NaiveDate> {
        match parse_date_token(raw)? {
            DateToken::Full(d) => Some(d),
            DateToken::MonthDay(m, d) => self.resolve_month_day(m, d),
        }
    }
}

/// First pattern whose two captures both parse as dates.
pub fn detect_period(text: &str, patterns: &[&Regex]) -> Option<Period> {
    patterns.iter().find_map(|re| {
        let c = re.captures(text)?;
        let start = parse_full_date(c.get(1)?.as_str())?;
        let end = parse_full_date(c.get(2)?.as_str())?;
        Some(Period::new(start, end))
    })
}

/// Detected period, else whatever the statement already knows, else the
/// trailing 30 days in `tz`.
pub fn period_or_fallback(detected: Option<Period>, statement: &Statement, tz: Tz) -> Period {
    if let Some(p) = detected {
        return p;
    }
    if let Some((start, end)) = statement.period() {
        return Period::new(start, end);
    }
    let (start, end) = time::trailing_period(time::today_in(tz));
    debug!(%start, %end, "no statement period found, using trailing 30 days");
    Period::new(start, end)
}

/// Period ending on a closing date, `days` long.
pub fn period_from_closing(closing: NaiveDate, days: i64) -> Period {
    Period::new(closing - Duration::days(days), closing)
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

static COMMA_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3},\d{2}$").unwrap());

/// Signed amount from statement text: `$1,234.56`, `-40.00`, `- $14.05`,
/// `($500.00)`, `48,25`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    let (parenthesised, s) = match s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, s),
    };
    let cleaned: String = s.chars().filter(|c| *c != '$' && !c.is_whitespace()).collect();
    let (minus, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    let normalized = if COMMA_DECIMAL.is_match(digits) {
        digits.replace(',', ".")
    } else {
        digits.replace(',', "")
    };
    let value = Decimal::from_str(&normalized).ok()?;
    Some(if parenthesised || minus { -value } else { value })
}

/// Unsigned money value with two decimal places (`5,000` → `5000.00`).
pub fn money(raw: &str) -> Option<Decimal> {
    let mut value = parse_amount(raw)?.abs();
    value.rescale(2);
    Some(value)
}

pub fn percent(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim().trim_end_matches('%')).ok()
}

// ---------------------------------------------------------------------------
// Regex helpers
// ---------------------------------------------------------------------------

pub fn capture<'t>(re: &Regex, text: &'t str, group: usize) -> Option<&'t str> {
    re.captures(text)?.get(group).map(|m| m.as_str())
}

/// Up to `len` bytes of `text` following the first case-insensitive hit of
/// `heading`, or the whole text when the heading is absent.
pub fn section_after<'t>(text: &'t str, heading: &str, len: usize) -> &'t str {
    let lower = text.to_lowercase();
    // Lowercasing can change byte lengths outside ASCII; fall back to the
    // whole text rather than slicing at a bad offset.
    if lower.len() != text.len() {
        return text;
    }
    match lower.find(&heading.to_lowercase()) {
        Some(start) => {
            let mut end = (start + len).min(text.len());
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            &text[start..end]
        }
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Statement summary (minimum payment, due date, YTD totals)
// ---------------------------------------------------------------------------

/// Per-issuer vocabulary for the statement summary box.
///
/// `ytd_*` patterns capture the year in group 1 (may be optional) and the
/// amount in group 2.
pub struct SummaryPatterns<'a> {
    pub issuer: &'static str,
    pub min_payment: Option<&'a Regex>,
    pub due_date: Option<&'a Regex>,
    pub ytd_fees: Option<&'a Regex>,
    pub ytd_interest: Option<&'a Regex>,
}

impl SummaryPatterns<'_> {
    pub fn apply(&self, text: &str, statement: &mut Statement, period: &Period) {
        let issuer = self.issuer;
        if let Some(v) = self.min_payment.and_then(|re| capture(re, text, 1)).and_then(money) {
            if fill_if_unset(&mut statement.minimum_payment, Some(v)) {
                debug!(issuer, minimum_payment = %v, "statement summary");
            }
        }
        if let Some(d) = self.due_date.and_then(|re| capture(re, text, 1)).and_then(|s| period.resolve(s)) {
            if fill_if_unset(&mut statement.payment_due_date, Some(d)) {
                debug!(issuer, due = %d, "statement summary");
            }
        }
        if let Some(c) = self.ytd_fees.and_then(|re| re.captures(text)) {
            if let Some(v) = c.get(2).and_then(|m| money(m.as_str())) {
                fill_if_unset(&mut statement.ytd_total_fees, Some(v));
                fill_if_unset(&mut statement.ytd_year, c.get(1).and_then(|y| y.as_str().parse().ok()));
                debug!(issuer, ytd_fees = %v, "statement summary");
            }
        }
        if let Some(c) = self.ytd_interest.and_then(|re| re.captures(text)) {
            if let Some(v) = c.get(2).and_then(|m| money(m.as_str())) {
                fill_if_unset(&mut statement.ytd_total_interest, Some(v));
                fill_if_unset(&mut statement.ytd_year, c.get(1).and_then(|y| y.as_str().parse().ok()));
                debug!(issuer, ytd_interest = %v, "statement summary");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Statement/account ids stamped onto every transaction of one run.
#[derive(Debug, Clone, Copy)]
pub struct Owner {
    pub statement_id: Uuid,
    pub account_id: Option<Uuid>,
}

impl Owner {
    pub fn of(statement: &Statement, account: Option<&Account>) -> Self {
        Self {
            statement_id: statement.id,
            account_id: account.map(|a| a.id).or(statement.account_id),
        }
    }

    /// Build a transaction from a raw description and an issuer pre-cleaned
    /// merchant string. The shared normalization runs on `precleaned`; if
    /// that leaves nothing, the raw description is normalized instead.
    pub fn transaction(
        &self,
        date: NaiveDate,
        post_date: Option<NaiveDate>,
        description: &str,
        precleaned: &str,
        amount: Decimal,
        ty: TransactionType,
    ) -> Transaction {
        let mut merchant = normalize_merchant(precleaned);
        if merchant.chars().count() < 2 {
            merchant = normalize_merchant(description);
        }
        if merchant.is_empty() {
            merchant = collapse_whitespace(description);
        }
        let category = categorize(&merchant, ty);
        Transaction {
            statement_id: self.statement_id,
            account_id: self.account_id,
            transaction_date: date,
            post_date,
            description: description.to_string(),
            merchant_name: merchant,
            category,
            amount: amount.abs(),
            transaction_type: ty,
        }
    }
}

static FEE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfees?\b").unwrap());

/// "fee" as a word, so COFFEE and FEEDER rows stay purchases.
pub fn mentions_fee(line: &str) -> bool {
    FEE_WORD.is_match(line)
}

/// Text contains any of the upper-case needles.
pub fn contains_any_upper(haystack_upper: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack_upper.contains(n))
}
