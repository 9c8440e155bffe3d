use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_core::{Category, InstitutionCode, Statement, TransactionType};
use tally_ingest::{ExtractionOutcome, StatementExtractionPipeline};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

fn run(name: &str) -> (Statement, ExtractionOutcome) {
    let text = fixture(name);
    let mut statement = Statement::new(name);
    let outcome = StatementExtractionPipeline::default().run_text(&text, &mut statement, None);
    (statement, outcome)
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[test]
fn test_amex_fixture() {
    let (st, out) = run("amex.txt");
    assert_eq!(out.institution, InstitutionCode::Amex);
    assert!(!out.used_fallback);
    assert_eq!(out.transactions.len(), 4);

    let txns = &out.transactions;
    assert_eq!(txns[0].transaction_type, TransactionType::Credit);
    assert_eq!(txns[0].amount, money(50000));
    assert_eq!(txns[1].merchant_name, "TRADER JOE S");
    assert_eq!(txns[1].category, Some(Category::Groceries));
    assert_eq!(txns[2].merchant_name, "KROGER #0412");
    assert_eq!(txns[3].merchant_name, "SPOTIFY USA");
    assert_eq!(txns[3].transaction_date, d(2026, 3, 2));

    assert_eq!(st.minimum_payment, Some(money(3500)));
    assert_eq!(st.payment_due_date, Some(d(2026, 4, 8)));
    assert_eq!(out.metadata.last4.as_deref(), Some("2005"));
    assert_eq!(out.metadata.current_balance, Some(money(84620)));
}

#[test]
fn test_chase_fixture() {
    let (st, out) = run("chase.txt");
    assert_eq!(out.institution, InstitutionCode::Chase);
    assert_eq!(out.transactions.len(), 5);

    let txns = &out.transactions;
    // loose tier: single space before the amount
    assert_eq!(txns[0].transaction_type, TransactionType::Credit);
    assert_eq!(txns[0].transaction_date, d(2026, 3, 1));
    assert_eq!(txns[1].merchant_name, "UBER EATS");
    assert_eq!(txns[1].category, Some(Category::Dining));
    assert_eq!(txns[2].transaction_type, TransactionType::Debit);
    assert_eq!(txns[4].transaction_type, TransactionType::Fee);
    assert_eq!(txns[4].category, Some(Category::Fees));

    assert_eq!(st.payment_due_date, Some(d(2026, 4, 12)));
    assert_eq!(st.ytd_total_fees, Some(money(9500)));
    assert_eq!(out.metadata.last4.as_deref(), Some("7788"));
    assert_eq!(out.metadata.credit_limit, Some(money(1_200_000)));
    assert_eq!(out.metadata.available_credit, Some(money(1_148_700)));
    assert_eq!(out.metadata.apr, Some(money(2149)));
}

#[test]
fn test_citi_fixture() {
    let (st, out) = run("citi.txt");
    assert_eq!(out.institution, InstitutionCode::Citi);
    assert_eq!(out.transactions.len(), 5);

    let txns = &out.transactions;
    assert_eq!(txns[0].transaction_type, TransactionType::Credit);
    assert_eq!(txns[0].merchant_name, "AUTOPAY");
    assert_eq!(txns[1].post_date, Some(d(2026, 2, 11)));
    assert_eq!(txns[3].merchant_name, "DOORDASH*TACODELI");
    assert_eq!(txns[3].category, Some(Category::Dining));
    assert_eq!(txns[4].transaction_date, d(2026, 3, 7));

    assert_eq!(st.minimum_payment, Some(money(4100)));
    assert_eq!(out.metadata.last4.as_deref(), Some("2210"));
    assert_eq!(out.metadata.apr, Some(money(2024)));
}

#[test]
fn test_bank_of_america_fixture() {
    let (st, out) = run("bank_of_america.txt");
    assert_eq!(out.institution, InstitutionCode::BankOfAmerica);
    assert_eq!(out.transactions.len(), 4);

    let txns = &out.transactions;
    assert_eq!(txns[0].transaction_type, TransactionType::Credit);
    assert_eq!(txns[1].merchant_name, "KROGER #0338");
    assert_eq!(txns[2].merchant_name, "CHEVRONUSA");
    assert_eq!(txns[2].category, Some(Category::Gas));
    assert_eq!(txns[3].description, "AMAZON MKTPLACE PMTS WA");
    assert_eq!(txns[3].merchant_name, "AMAZON");
    assert_eq!(txns[3].amount, money(2799));
    assert_eq!(txns[3].post_date, Some(d(2026, 3, 1)));

    assert_eq!(st.minimum_payment, Some(money(2900)));
    assert_eq!(st.payment_due_date, Some(d(2026, 4, 2)));
    assert_eq!(out.metadata.last4.as_deref(), Some("9012"));
    assert_eq!(out.metadata.credit_limit, Some(money(600_000)));
    assert_eq!(out.metadata.current_balance, Some(money(38845)));
}

#[test]
fn test_capital_one_fixture() {
    let (st, out) = run("capital_one.txt");
    assert_eq!(out.institution, InstitutionCode::CapitalOne);
    assert_eq!(out.transactions.len(), 4);

    let txns = &out.transactions;
    // December rows on a January-closing statement
    assert_eq!(txns[0].transaction_date, d(2025, 12, 20));
    assert_eq!(txns[0].category, Some(Category::Travel));
    assert_eq!(txns[1].transaction_type, TransactionType::Credit);
    assert_eq!(txns[1].amount, money(25000));
    assert_eq!(txns[2].transaction_date, d(2026, 1, 3));
    assert_eq!(txns[2].post_date, Some(d(2026, 1, 4)));

    assert_eq!(st.payment_due_date, Some(d(2026, 2, 11)));
    assert_eq!(st.ytd_year, Some(2026));
    assert_eq!(out.metadata.last4.as_deref(), Some("3377"));
    assert_eq!(out.metadata.apr, Some(money(2799)));
}

#[test]
fn test_discover_fixture() {
    let (st, out) = run("discover.txt");
    assert_eq!(out.institution, InstitutionCode::Discover);
    assert_eq!(out.transactions.len(), 5);

    let txns = &out.transactions;
    assert_eq!(txns[0].transaction_type, TransactionType::Credit);
    assert_eq!(txns[2].merchant_name, "OLIVE GARDEN");
    assert_eq!(txns[2].category, Some(Category::Dining));
    assert_eq!(txns[3].amount, money(1125));
    assert_eq!(txns[4].transaction_type, TransactionType::Credit);

    assert_eq!(st.minimum_payment, Some(money(3500)));
    assert_eq!(out.metadata.credit_limit, Some(money(400_000)));
    assert_eq!(out.metadata.last4.as_deref(), Some("8120"));
}

#[test]
fn test_goldman_sachs_fixture() {
    let (st, out) = run("goldman_sachs.txt");
    assert_eq!(out.institution, InstitutionCode::GoldmanSachs);
    assert_eq!(out.transactions.len(), 4);

    let payment = &out.transactions[2];
    assert_eq!(payment.transaction_date, d(2026, 2, 11));
    assert_eq!(payment.transaction_type, TransactionType::Credit);
    assert_eq!(payment.amount, money(25000));
    assert_eq!(out.transactions[1].category, Some(Category::Groceries));
    assert_eq!(out.transactions[3].category, Some(Category::Transportation));

    assert_eq!(st.payment_due_date, Some(d(2026, 3, 31)));
    assert_eq!(out.metadata.last4.as_deref(), Some("6612"));
    assert_eq!(out.metadata.current_balance, Some(money(31840)));
}

#[test]
fn test_wells_fargo_fixture() {
    let (st, out) = run("wells_fargo.txt");
    assert_eq!(out.institution, InstitutionCode::WellsFargo);
    assert_eq!(out.transactions.len(), 4);
    assert_eq!(out.transactions[1].transaction_type, TransactionType::Credit);
    assert_eq!(out.transactions[2].category, Some(Category::HealthFitness));
    assert_eq!(out.transactions[3].transaction_date, d(2026, 3, 2));
    assert_eq!(st.minimum_payment, Some(money(3500)));
}

#[test]
fn test_generic_fixture() {
    let (_, out) = run("generic.txt");
    assert_eq!(out.institution, InstitutionCode::Generic);
    assert!(!out.used_fallback);
    assert_eq!(out.transactions.len(), 3);
    assert_eq!(out.transactions[1].transaction_type, TransactionType::Credit);
    assert_eq!(out.transactions[2].merchant_name, "SHELL OIL");
    assert_eq!(out.metadata, tally_core::AccountMetadata::default());
}

#[test]
fn test_every_fixture_is_deterministic() {
    for name in [
        "amex.txt",
        "chase.txt",
        "citi.txt",
        "bank_of_america.txt",
        "capital_one.txt",
        "discover.txt",
        "goldman_sachs.txt",
        "wells_fargo.txt",
        "generic.txt",
    ] {
        let text = fixture(name);
        let pipeline = StatementExtractionPipeline::default();
        let mut statement = Statement::new(name);
        let first = pipeline.run_text(&text, &mut statement, None);
        statement.reset_derived();
        let second = pipeline.run_text(&text, &mut statement, None);
        assert_eq!(first.transactions, second.transactions, "{name}");
    }
}
