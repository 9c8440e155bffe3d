use std::sync::Arc;

use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use rust_decimal::Decimal;
use tally_core::{Account, AccountType, InstitutionCode, StatementStatus};
use tally_finance::{
    MemoryStore, ProcessError, StatementProcessor, StatementStore, StatementSummary, Upload,
};
use tally_ingest::{ExtractionConfig, StatementExtractionPipeline};
use uuid::Uuid;

fn show(x: i64, y: i64, s: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 10.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(s)]),
        Operation::new("ET", vec![]),
    ]
}

fn one_page_pdf(ops: Vec<Operation>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content { operations: ops };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn chase_pdf(last4: &str) -> Vec<u8> {
    let mut ops = show(50, 755, "CHASE FREEDOM UNLIMITED");
    ops.extend(show(50, 740, &format!("Account Number: XXXX XXXX XXXX {last4}")));
    ops.extend(show(50, 725, "Opening/Closing Date 01/16/26 - 02/15/26"));
    ops.extend(show(50, 710, "ACCOUNT ACTIVITY"));
    ops.extend(show(50, 695, "02/12"));
    ops.extend(show(120, 695, "AUTOMATIC PAYMENT - THANK YOU"));
    ops.extend(show(450, 695, "-40.00"));
    ops.extend(show(50, 680, "01/18"));
    ops.extend(show(120, 680, "WHOLEFDS MKT 10234"));
    ops.extend(show(450, 680, "23.45"));
    one_page_pdf(ops)
}

fn chase_checking_pdf() -> Vec<u8> {
    let lines = [
        "CHASE TOTAL CHECKING",
        "Account Number: XXXX XXXX XXXX 7788",
        "CHECKING SUMMARY",
        "TRANSACTION DETAIL",
        "DATE DESCRIPTION AMOUNT BALANCE",
        "Beginning Balance 68.70",
        "04/22 Discover E-Payment 8148 Web ID: 2510020270 -15.00 53.70",
        "04/25 Payroll Direct Dep PPD ID: 9876543210 1,250.00 1,303.70",
        "Ending Balance 1,303.70",
    ];
    let mut ops = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        ops.extend(show(50, 755 - 15 * i as i64, line));
    }
    one_page_pdf(ops)
}

fn processor() -> StatementProcessor<MemoryStore> {
    StatementProcessor::new(Arc::new(MemoryStore::new()), StatementExtractionPipeline::default())
}

fn upload(name: &str, document: Vec<u8>) -> Upload {
    Upload {
        file_name: name.to_string(),
        file_path: None,
        document,
        account_id: None,
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[tokio::test]
async fn test_submit_runs_to_completed() {
    let p = processor();
    let submitted = p.submit(upload("feb.pdf", chase_pdf("4821"))).await.unwrap();
    assert_eq!(submitted.statement.status, StatementStatus::Pending);

    let done = submitted.task.await.unwrap().unwrap();
    assert_eq!(done.status, StatementStatus::Completed);
    assert_eq!(done.error_message, None);
    assert_eq!(done.start_date, Some(d(2026, 1, 18)));
    assert_eq!(done.end_date, Some(d(2026, 2, 12)));
    assert_eq!(done.statement_month, Some(d(2026, 1, 1)));
    assert_eq!(done.total_debits, Some(Decimal::new(2345, 2)));
    assert_eq!(done.total_credits, Some(Decimal::new(4000, 2)));
    assert_eq!(done.payment_due_date, Some(d(2026, 3, 15)));

    let stored = p.store().statement(done.id).unwrap().unwrap();
    assert_eq!(stored, done);

    let account_id = done.account_id.expect("statement linked");
    let account = p.store().account(account_id).unwrap().unwrap();
    assert_eq!(account.name, "Chase ···4821");
    assert_eq!(account.institution, InstitutionCode::Chase);
    assert_eq!(account.payment_due_day, Some(15));

    let txns = p.store().transactions(done.id).unwrap();
    assert_eq!(txns.len(), 2);
    assert!(txns.iter().all(|t| t.account_id == Some(account_id)));
    assert!(txns.iter().all(|t| t.statement_id == done.id));
}

#[tokio::test]
async fn test_new_accounts_take_type_from_statement() {
    let p = processor();
    let checking = p.submit(upload("checking.pdf", chase_checking_pdf())).await.unwrap();
    let checking = checking.task.await.unwrap().unwrap();
    assert_eq!(checking.status, StatementStatus::Completed);
    assert_eq!(p.store().transactions(checking.id).unwrap().len(), 2);
    let account = p.store().account(checking.account_id.unwrap()).unwrap().unwrap();
    assert_eq!(account.metadata.account_type, Some(AccountType::Checking));

    let card = p.submit(upload("card.pdf", chase_pdf("4821"))).await.unwrap();
    let card = card.task.await.unwrap().unwrap();
    let account = p.store().account(card.account_id.unwrap()).unwrap().unwrap();
    assert_eq!(account.metadata.account_type, Some(AccountType::CreditCard));
}

#[tokio::test]
async fn test_same_card_links_existing_account() {
    let p = processor();
    let first = p.submit(upload("feb.pdf", chase_pdf("4821"))).await.unwrap();
    let first = first.task.await.unwrap().unwrap();
    let second = p.submit(upload("mar.pdf", chase_pdf("4821"))).await.unwrap();
    let second = second.task.await.unwrap().unwrap();
    let other = p.submit(upload("other.pdf", chase_pdf("1100"))).await.unwrap();
    let other = other.task.await.unwrap().unwrap();

    assert_eq!(first.account_id, second.account_id);
    assert_ne!(first.account_id, other.account_id);
    assert_eq!(p.store().accounts().unwrap().len(), 2);
}

#[tokio::test]
async fn test_reprocess_is_idempotent() {
    let p = processor();
    let submitted = p.submit(upload("feb.pdf", chase_pdf("4821"))).await.unwrap();
    let first = submitted.task.await.unwrap().unwrap();
    let before = p.store().transactions(first.id).unwrap();

    for _ in 0..2 {
        let again = p.reprocess(first.id).await.unwrap();
        assert_eq!(again.statement.status, StatementStatus::Pending);
        assert_eq!(again.statement.payment_due_date, None);
        let done = again.task.await.unwrap().unwrap();
        assert_eq!(done, first);
    }

    assert_eq!(p.store().transactions(first.id).unwrap(), before);
    assert_eq!(p.store().accounts().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unreadable_document_fails_statement() {
    let mut config = ExtractionConfig::default();
    config.ocr.tesseract_candidates = vec!["/nonexistent/bin/tesseract".into()];
    let p = StatementProcessor::new(
        Arc::new(MemoryStore::new()),
        StatementExtractionPipeline::new(config),
    );

    let submitted = p
        .submit(upload("scan.pdf", one_page_pdf(show(50, 700, "scan"))))
        .await
        .unwrap();
    let done = submitted.task.await.unwrap().unwrap();
    assert_eq!(done.status, StatementStatus::Failed);
    assert!(done.error_message.as_deref().unwrap().contains("Tesseract"));
    assert!(p.store().transactions(done.id).unwrap().is_empty());
    assert_eq!(p.store().statement(done.id).unwrap().unwrap().status, StatementStatus::Failed);
}

#[tokio::test]
async fn test_upload_with_known_account_skips_linking() {
    let p = processor();
    let mut manual = Account::new("My Chase", InstitutionCode::Chase);
    manual.metadata.last4 = Some("0000".into());
    p.store().save_account(&manual).unwrap();

    let mut up = upload("feb.pdf", chase_pdf("4821"));
    up.account_id = Some(manual.id);
    let done = p.submit(up).await.unwrap().task.await.unwrap().unwrap();

    assert_eq!(done.account_id, Some(manual.id));
    assert_eq!(p.store().accounts().unwrap().len(), 1);
    let account = p.store().account(manual.id).unwrap().unwrap();
    assert_eq!(account.payment_due_day, Some(15));
}

#[tokio::test]
async fn test_unknown_upload_account_is_ignored() {
    let p = processor();
    let mut up = upload("feb.pdf", chase_pdf("4821"));
    up.account_id = Some(Uuid::new_v4());
    let submitted = p.submit(up).await.unwrap();
    assert_eq!(submitted.statement.account_id, None);
    let done = submitted.task.await.unwrap().unwrap();
    assert!(done.account_id.is_some());
}

#[tokio::test]
async fn test_assign_account_backfills_transactions() {
    let p = processor();
    let done = p
        .submit(upload("feb.pdf", chase_pdf("4821")))
        .await
        .unwrap()
        .task
        .await
        .unwrap()
        .unwrap();

    let target = Account::new("Joint Chase", InstitutionCode::Chase);
    p.store().save_account(&target).unwrap();
    let st = p.assign_account(done.id, target.id).unwrap();
    assert_eq!(st.account_id, Some(target.id));

    let txns = p.store().transactions(done.id).unwrap();
    assert_eq!(txns.len(), 2);
    assert!(txns.iter().all(|t| t.account_id == Some(target.id)));

    let missing = p.assign_account(done.id, Uuid::new_v4());
    assert!(matches!(missing, Err(ProcessError::AccountNotFound(_))));
}

#[tokio::test]
async fn test_delete_removes_statement_and_transactions() {
    let p = processor();
    let done = p
        .submit(upload("feb.pdf", chase_pdf("4821")))
        .await
        .unwrap()
        .task
        .await
        .unwrap()
        .unwrap();

    assert_eq!(p.delete(done.id).unwrap(), 2);
    assert!(p.store().statement(done.id).unwrap().is_none());
    assert!(p.store().transactions(done.id).unwrap().is_empty());
    assert!(p.store().document(done.id).unwrap().is_none());
    assert!(matches!(p.delete(done.id), Err(ProcessError::StatementNotFound(_))));
}

#[tokio::test]
async fn test_process_unknown_statement() {
    let p = processor();
    let err = p.process(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ProcessError::StatementNotFound(_)));
}

#[tokio::test]
async fn test_many_statements_concurrently() {
    let p = processor();
    let mut tasks = Vec::new();
    for (i, last4) in ["1111", "2222", "3333", "1111"].iter().enumerate() {
        let s = p.submit(upload(&format!("s{i}.pdf"), chase_pdf(last4))).await.unwrap();
        tasks.push(s.task);
    }
    for task in tasks {
        let st = task.await.unwrap().unwrap();
        assert_eq!(st.status, StatementStatus::Completed);
        let txns = p.store().transactions(st.id).unwrap();
        let summary = StatementSummary::build(&st, &txns);
        assert_eq!(summary.total_debits, Decimal::new(2345, 2));
    }
    assert_eq!(p.store().statements().unwrap().len(), 4);
}
