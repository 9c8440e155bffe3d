//! Statement extractors, one per issuer plus the generic fallback.
//!
//! Each extractor owns its regex vocabulary and runs the same skeleton:
//! period detection, section tracking, a per-line tier cascade, date
//! resolution against the period, and best-effort metadata. Shared pieces
//! live in [`common`].

use tally_core::{Account, AccountMetadata, InstitutionCode, Statement, Transaction};

pub mod common;

pub mod amex;
pub mod bank_of_america;
pub mod capital_one;
pub mod chase;
pub mod citi;
pub mod discover;
pub mod generic;
pub mod goldman_sachs;
pub mod wells_fargo;

pub use amex::AmexExtractor;
pub use bank_of_america::BankOfAmericaExtractor;
pub use capital_one::CapitalOneExtractor;
pub use chase::ChaseExtractor;
pub use citi::CitiExtractor;
pub use discover::DiscoverExtractor;
pub use generic::GenericExtractor;
pub use goldman_sachs::GoldmanSachsExtractor;
pub use wells_fargo::WellsFargoExtractor;

/// Turns one issuer's statement text into transactions.
///
/// Implementations are stateless apart from configuration, so one instance
/// serves any number of concurrent documents. The only side effects are the
/// documented writes into `statement` and the account metadata.
pub trait StatementExtractor: Send + Sync {
    fn institution(&self) -> InstitutionCode;

    fn supports(&self, code: InstitutionCode) -> bool {
        code == self.institution()
    }

    /// Parse every recognisable transaction line. Lines that match no tier
    /// are skipped. Statement summary fields (minimum payment, due date, YTD
    /// totals) are filled as a side effect when unset.
    fn extract_transactions(
        &self,
        text: &str,
        statement: &mut Statement,
        account: Option<&Account>,
    ) -> Vec<Transaction>;

    /// Fill account fields the statement reveals. Only `current_balance`
    /// overwrites an existing value.
    fn extract_account_metadata(&self, _text: &str, _account: &mut AccountMetadata) {}
}
