//! Record types produced by statement extraction.
//!
//! `Statement` and `Account` are owned by whoever persists them; extractors only
//! mutate them in place. Amounts are exact decimals so reprocessing the same
//! document always yields identical values.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::categorizer::Category;

/// Closed set of issuers we know how to read. Used only to pick an extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstitutionCode {
    Amex,
    Chase,
    Citi,
    WellsFargo,
    CapitalOne,
    Discover,
    BankOfAmerica,
    GoldmanSachs,
    Generic,
}

impl InstitutionCode {
    pub const ALL: [InstitutionCode; 9] = [
        InstitutionCode::Amex,
        InstitutionCode::Chase,
        InstitutionCode::Citi,
        InstitutionCode::WellsFargo,
        InstitutionCode::CapitalOne,
        InstitutionCode::Discover,
        InstitutionCode::BankOfAmerica,
        InstitutionCode::GoldmanSachs,
        InstitutionCode::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstitutionCode::Amex => "AMEX",
            InstitutionCode::Chase => "CHASE",
            InstitutionCode::Citi => "CITI",
            InstitutionCode::WellsFargo => "WELLS_FARGO",
            InstitutionCode::CapitalOne => "CAPITAL_ONE",
            InstitutionCode::Discover => "DISCOVER",
            InstitutionCode::BankOfAmerica => "BANK_OF_AMERICA",
            InstitutionCode::GoldmanSachs => "GOLDMAN_SACHS",
            InstitutionCode::Generic => "GENERIC",
        }
    }

    /// Name used when an account is created from a statement. `None` for GENERIC.
    pub fn card_name(&self) -> Option<&'static str> {
        match self {
            InstitutionCode::Amex => Some("American Express Card"),
            InstitutionCode::Chase => Some("Chase Card"),
            InstitutionCode::Citi => Some("Citi Card"),
            InstitutionCode::WellsFargo => Some("Wells Fargo Card"),
            InstitutionCode::CapitalOne => Some("Capital One Card"),
            InstitutionCode::Discover => Some("Discover Card"),
            InstitutionCode::BankOfAmerica => Some("Bank of America Card"),
            InstitutionCode::GoldmanSachs => Some("Apple Card"),
            InstitutionCode::Generic => None,
        }
    }
}

impl fmt::Display for InstitutionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstitutionCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        InstitutionCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == wanted)
            .ok_or_else(|| format!("unknown institution code: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Direction of a transaction. Amounts are never signed; this carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Debit,
    Credit,
    Payment,
    Fee,
    Interest,
}

impl TransactionType {
    /// Money leaving the account holder (purchases, fees, interest).
    pub fn is_outflow(&self) -> bool {
        matches!(
            self,
            TransactionType::Debit | TransactionType::Fee | TransactionType::Interest
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Checking,
    Savings,
    CreditCard,
    Loan,
}

/// One uploaded statement document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub file_name: String,
    pub file_path: Option<String>,
    /// First day of the month the statement belongs to
    pub statement_month: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub opening_balance: Option<Decimal>,
    pub closing_balance: Option<Decimal>,
    pub total_credits: Option<Decimal>,
    pub total_debits: Option<Decimal>,
    pub minimum_payment: Option<Decimal>,
    pub payment_due_date: Option<NaiveDate>,
    pub ytd_total_fees: Option<Decimal>,
    pub ytd_total_interest: Option<Decimal>,
    pub ytd_year: Option<i32>,
    pub status: StatementStatus,
    pub error_message: Option<String>,
}

impl Statement {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id: None,
            file_name: file_name.into(),
            file_path: None,
            statement_month: None,
            start_date: None,
            end_date: None,
            opening_balance: None,
            closing_balance: None,
            total_credits: None,
            total_debits: None,
            minimum_payment: None,
            payment_due_date: None,
            ytd_total_fees: None,
            ytd_total_interest: None,
            ytd_year: None,
            status: StatementStatus::Pending,
            error_message: None,
        }
    }

    /// Known billing period, if both ends are set.
    pub fn period(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.start_date?, self.end_date?))
    }

    /// Clear everything extraction derives so the document can be read again
    /// from scratch. Identity, file and account link are kept.
    pub fn reset_derived(&mut self) {
        self.statement_month = None;
        self.start_date = None;
        self.end_date = None;
        self.opening_balance = None;
        self.closing_balance = None;
        self.total_credits = None;
        self.total_debits = None;
        self.minimum_payment = None;
        self.payment_due_date = None;
        self.ytd_total_fees = None;
        self.ytd_total_interest = None;
        self.ytd_year = None;
        self.status = StatementStatus::Pending;
        self.error_message = None;
    }

    /// Set period and month bucket from the transaction date range.
    pub fn apply_transaction_span(&mut self, txns: &[Transaction]) {
        let min = txns.iter().map(|t| t.transaction_date).min();
        let max = txns.iter().map(|t| t.transaction_date).max();
        if let (Some(min), Some(max)) = (min, max) {
            self.start_date = Some(min);
            self.end_date = Some(max);
            self.statement_month = NaiveDate::from_ymd_opt(min.year(), min.month(), 1);
        }
    }

    /// Recompute credit/debit totals.
    pub fn apply_totals(&mut self, txns: &[Transaction]) {
        let (mut debits, mut credits) = (Decimal::ZERO, Decimal::ZERO);
        for t in txns {
            if t.transaction_type.is_outflow() {
                debits += t.amount;
            } else {
                credits += t.amount;
            }
        }
        self.total_debits = Some(debits);
        self.total_credits = Some(credits);
    }
}

/// The part of an account a statement is allowed to update.
///
/// Every field except `current_balance` is written only while unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountMetadata {
    pub account_type: Option<AccountType>,
    pub last4: Option<String>,
    /// Percent, e.g. 24.99
    pub apr: Option<Decimal>,
    pub promo_apr: Option<Decimal>,
    pub promo_apr_end_date: Option<NaiveDate>,
    pub credit_limit: Option<Decimal>,
    pub available_credit: Option<Decimal>,
    pub current_balance: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub institution: InstitutionCode,
    #[serde(flatten)]
    pub metadata: AccountMetadata,
    pub payment_due_day: Option<u32>,
}

impl Account {
    pub fn new(name: impl Into<String>, institution: InstitutionCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            institution,
            metadata: AccountMetadata::default(),
            payment_due_day: None,
        }
    }

    /// Account created automatically for a classified statement,
    /// e.g. "Chase ···4321" or "Apple Card".
    pub fn for_institution(institution: InstitutionCode, last4: Option<&str>) -> Option<Self> {
        let base = institution.card_name()?;
        let name = match last4 {
            Some(l4) => base.replace(" Card", &format!(" ···{l4}")),
            None => base.to_string(),
        };
        let mut account = Account::new(name, institution);
        account.metadata.last4 = last4.map(str::to_string);
        Some(account)
    }
}

/// One statement line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub statement_id: Uuid,
    pub account_id: Option<Uuid>,
    pub transaction_date: NaiveDate,
    pub post_date: Option<NaiveDate>,
    pub description: String,
    pub merchant_name: String,
    pub category: Option<Category>,
    /// Always non-negative
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
}

/// Write `value` into `slot` only when the slot is empty. Returns true on write.
pub fn fill_if_unset<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match (slot.is_none(), value) {
        (true, Some(v)) => {
            *slot = Some(v);
            true
        }
        _ => false,
    }
}
