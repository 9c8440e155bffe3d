//! Institution-agnostic cleanup of raw statement descriptions.
//!
//! Extractors run their own issuer-specific pre-clean first, then hand the
//! result to [`normalize_merchant`].

use once_cell::sync::Lazy;
use regex::Regex;

static TRAILING_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+\d{5,}.*$").unwrap());
static BANK_CODE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:(?:POS|DDA|ACH|PPD|CCD)\s+)+").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse runs of whitespace to one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Clean a description into a merchant name.
///
/// Drops everything from the first long digit run (store/reference numbers),
/// leading bank transaction codes and redundant whitespace. Idempotent.
pub fn normalize_merchant(description: &str) -> String {
    let collapsed = collapse_whitespace(description);
    let without_ref = TRAILING_REFERENCE.replace(&collapsed, "");
    let without_code = BANK_CODE_PREFIX.replace(&without_ref, "");
    without_code.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_reference_numbers() {
        assert_eq!(normalize_merchant("WHOLEFDS MKT 10234 AUSTIN TX"), "WHOLEFDS MKT");
        assert_eq!(normalize_merchant("SHELL OIL 5744"), "SHELL OIL 5744");
    }

    #[test]
    fn test_strips_bank_codes() {
        assert_eq!(normalize_merchant("POS  STARBUCKS   STORE"), "STARBUCKS STORE");
        assert_eq!(normalize_merchant("ach ppd PAYROLL"), "PAYROLL");
    }

    #[test]
    fn test_idempotent_on_samples() {
        let samples = [
            "POS POS STARBUCKS 000123456",
            "ACH 12345",
            "  DDA   AMAZON MKTPLACE  ",
            "UBER   *TRIP 8005928996 CA",
            "CCD",
            "",
            "TST* DIN TAI FUNG 00012 SEATTLE WA",
        ];
        for s in samples {
            let once = normalize_merchant(s);
            assert_eq!(normalize_merchant(&once), once, "not idempotent for {s:?}");
        }
    }
}
