//! Time utilities: timezone-aware "today" and billing-period arithmetic.

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use chrono_tz::Tz;

/// Parse an IANA zone name like "America/Chicago".
pub fn parse_tz(tz: &str) -> Result<Tz> {
    tz.parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))
}

/// Current calendar date in the given zone.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Fallback period when a statement says nothing usable: the 30 days up to `today`.
pub fn trailing_period(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(30), today)
}

/// Day of month a payment is due, carried onto the account.
pub fn due_day(due: NaiveDate) -> u32 {
    chrono::Datelike::day(&due)
}
