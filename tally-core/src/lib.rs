//! tally-core: statement/account/transaction model, merchant normalization and
//! the keyword categorizer shared by every extractor.

pub mod categorizer;
pub mod model;
pub mod normalize;
pub mod time;

pub use categorizer::{Category, categorize};
pub use model::{
    Account, AccountMetadata, AccountType, InstitutionCode, Statement, StatementStatus,
    Transaction, TransactionType, fill_if_unset,
};
pub use normalize::{collapse_whitespace, normalize_merchant};
