//! Decide which issuer produced a statement.
//!
//! The header window is searched first, then the whole document. Rule order
//! matters: an Amex statement that mentions "Bank of America" as an ACH
//! intermediary further down must still come out as AMEX, and "chase" is
//! common enough in other issuers' boilerplate that it sits behind the more
//! distinctive names. Keywords are plain substrings ("discovercard.com" is
//! Discover) except "chase", which must not follow a letter so "purchase"
//! never reads as Chase.

use tally_core::InstitutionCode;
use tracing::{debug, info};

use crate::config::ClassifierConfig;

const HEADER_RULES: &[(InstitutionCode, &[&str])] = &[
    (InstitutionCode::Amex, &["american express", "americanexpress.com"]),
    (InstitutionCode::BankOfAmerica, &["bank of america", "bankofamerica"]),
    (InstitutionCode::WellsFargo, &["wells fargo"]),
    (InstitutionCode::Citi, &["citibank", "citi card", "citicards"]),
    (InstitutionCode::CapitalOne, &["capital one", "capitalone.com"]),
    (InstitutionCode::Chase, &["chase", "jpmorgan"]),
    (InstitutionCode::Discover, &["discover", "dfs services"]),
    (InstitutionCode::GoldmanSachs, &["goldman sachs", "apple card", "applecard.apple.com"]),
];

// Same order; "citicards" only counts inside the header window.
const BODY_RULES: &[(InstitutionCode, &[&str])] = &[
    (InstitutionCode::Amex, &["american express", "americanexpress.com"]),
    (InstitutionCode::BankOfAmerica, &["bank of america", "bankofamerica"]),
    (InstitutionCode::WellsFargo, &["wells fargo"]),
    (InstitutionCode::Citi, &["citibank", "citi card"]),
    (InstitutionCode::CapitalOne, &["capital one", "capitalone.com"]),
    (InstitutionCode::Chase, &["chase", "jpmorgan"]),
    (InstitutionCode::Discover, &["discover", "dfs services"]),
    (InstitutionCode::GoldmanSachs, &["goldman sachs", "apple card", "applecard.apple.com"]),
];

#[derive(Debug, Clone)]
pub struct InstitutionClassifier {
    header_window: usize,
}

impl Default for InstitutionClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

impl InstitutionClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            header_window: config.header_window,
        }
    }

    pub fn classify(&self, text: &str) -> InstitutionCode {
        let header: String = text.chars().take(self.header_window).collect::<String>().to_lowercase();
        if let Some(code) = scan(&header, HEADER_RULES) {
            info!(institution = %code, "classified from header");
            return code;
        }

        let body = text.to_lowercase();
        if let Some(code) = scan(&body, BODY_RULES) {
            info!(institution = %code, "classified from full text");
            return code;
        }

        debug!("no issuer keyword found");
        InstitutionCode::Generic
    }
}

fn scan(haystack: &str, rules: &[(InstitutionCode, &[&str])]) -> Option<InstitutionCode> {
    rules
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| contains_keyword(haystack, n)))
        .map(|(code, _)| *code)
}

fn contains_keyword(haystack: &str, needle: &str) -> bool {
    if needle != "chase" {
        return haystack.contains(needle);
    }
    haystack
        .match_indices(needle)
        .any(|(at, _)| !haystack[..at].chars().next_back().is_some_and(char::is_alphabetic))
}
