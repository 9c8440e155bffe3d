//! Statement processing service.
//!
//! `submit` stores a PENDING statement with its document and hands the rest
//! to a background task: PENDING → PROCESSING → COMPLETED | FAILED. PDF work
//! runs on the blocking pool; transactions are written once, after the whole
//! document has been read.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::{
    Account, AccountMetadata, AccountType, InstitutionCode, Statement, StatementStatus,
    time::due_day,
};
use tally_ingest::{ExtractionOutcome, StatementExtractionPipeline};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ProcessError;
use crate::store::StatementStore;

// "Account Number: XXXX XXXX XXXX 1234", "Card ending ****-****-****-1234"
static LAST4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:account|card)\s*(?:number|ending|#)[:\s]+(?:[Xx*]{4}[\s-]*){2,3}(\d{4})")
        .unwrap()
});

/// A document handed in for processing.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub file_path: Option<String>,
    pub document: Vec<u8>,
    /// Account the caller already knows the statement belongs to
    pub account_id: Option<Uuid>,
}

/// The stored PENDING statement plus the background task processing it.
/// The task resolves to the statement in its final state.
pub struct Submitted {
    pub statement: Statement,
    pub task: JoinHandle<Result<Statement, ProcessError>>,
}

pub struct StatementProcessor<S> {
    store: Arc<S>,
    pipeline: Arc<StatementExtractionPipeline>,
}

impl<S> Clone for StatementProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

impl<S: StatementStore + 'static> StatementProcessor<S> {
    pub fn new(store: Arc<S>, pipeline: StatementExtractionPipeline) -> Self {
        Self {
            store,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist the statement as PENDING and start processing it in the
    /// background. Returns as soon as the statement is stored.
    pub async fn submit(&self, upload: Upload) -> Result<Submitted, ProcessError> {
        let mut statement = Statement::new(upload.file_name);
        statement.file_path = upload.file_path;
        if let Some(account_id) = upload.account_id {
            if self.store.account(account_id)?.is_some() {
                statement.account_id = Some(account_id);
            } else {
                warn!(%account_id, "upload names an unknown account, ignoring");
            }
        }

        self.store.put_document(statement.id, upload.document)?;
        self.store.save_statement(&statement)?;
        info!(statement = %statement.id, file = %statement.file_name, "statement submitted");

        let task = self.spawn(statement.id);
        Ok(Submitted { statement, task })
    }

    /// Throw away everything derived from the document and read it again.
    /// Running this any number of times leaves one set of transactions.
    pub async fn reprocess(&self, id: Uuid) -> Result<Submitted, ProcessError> {
        let mut statement = self.load(id)?;
        let removed = self.store.delete_transactions(id)?;
        if removed > 0 {
            info!(statement = %id, removed, "deleted transactions before reprocessing");
        }
        statement.reset_derived();
        self.store.save_statement(&statement)?;

        let task = self.spawn(id);
        Ok(Submitted { statement, task })
    }

    fn spawn(&self, id: Uuid) -> JoinHandle<Result<Statement, ProcessError>> {
        let this = self.clone();
        tokio::spawn(async move { this.process(id).await })
    }

    /// Run one statement to COMPLETED or FAILED.
    ///
    /// A document that cannot be read is a FAILED statement, not an error;
    /// errors are reserved for a missing statement and store failures.
    pub async fn process(&self, id: Uuid) -> Result<Statement, ProcessError> {
        match self.process_inner(id).await {
            Ok(statement) => Ok(statement),
            Err(e @ (ProcessError::StatementNotFound(_) | ProcessError::Store(_))) => Err(e),
            Err(e) => {
                error!(statement = %id, error = %e, "statement processing failed");
                let mut statement = self.load(id)?;
                statement.status = StatementStatus::Failed;
                statement.error_message = Some(e.to_string());
                self.store.save_statement(&statement)?;
                Ok(statement)
            }
        }
    }

    async fn process_inner(&self, id: Uuid) -> Result<Statement, ProcessError> {
        let mut statement = self.load(id)?;
        statement.status = StatementStatus::Processing;
        self.store.save_statement(&statement)?;

        let document = self
            .store
            .document(id)?
            .ok_or(ProcessError::DocumentMissing(id))?;
        let account = match statement.account_id {
            Some(account_id) => self.store.account(account_id)?,
            None => None,
        };

        let pipeline = Arc::clone(&self.pipeline);
        let store = Arc::clone(&self.store);
        let (mut statement, account, outcome) = tokio::task::spawn_blocking(move || {
            extract(&pipeline, store.as_ref(), &document, statement, account)
        })
        .await??;

        if let Some(mut account) = account {
            if let Some(due) = statement.payment_due_date {
                account.payment_due_day = Some(due_day(due));
                info!(account = %account.name, due_day = due_day(due), "payment due day carried forward");
            }
            self.store.save_account(&account)?;
        }

        let transactions = outcome.transactions;
        statement.apply_transaction_span(&transactions);
        statement.apply_totals(&transactions);
        let count = transactions.len();
        self.store.replace_transactions(id, transactions)?;

        statement.status = StatementStatus::Completed;
        statement.error_message = None;
        self.store.save_statement(&statement)?;
        info!(
            statement = %id,
            institution = %outcome.institution,
            count,
            used_fallback = outcome.used_fallback,
            "statement processing complete"
        );
        Ok(statement)
    }

    /// Link a statement to an account and stamp the account on every one
    /// of its transactions.
    pub fn assign_account(
        &self,
        statement_id: Uuid,
        account_id: Uuid,
    ) -> Result<Statement, ProcessError> {
        let mut statement = self.load(statement_id)?;
        let account = self
            .store
            .account(account_id)?
            .ok_or(ProcessError::AccountNotFound(account_id))?;

        statement.account_id = Some(account.id);
        self.store.save_statement(&statement)?;

        let mut transactions = self.store.transactions(statement_id)?;
        for t in &mut transactions {
            t.account_id = Some(account.id);
        }
        let count = transactions.len();
        self.store.replace_transactions(statement_id, transactions)?;

        info!(account = %account.name, statement = %statement_id, count, "account assigned");
        Ok(statement)
    }

    /// Remove a statement with its transactions and document. Returns the
    /// number of transactions deleted.
    pub fn delete(&self, id: Uuid) -> Result<usize, ProcessError> {
        self.load(id)?;
        let removed = self.store.delete_transactions(id)?;
        self.store.delete_document(id)?;
        self.store.delete_statement(id)?;
        info!(statement = %id, removed, "statement deleted");
        Ok(removed)
    }

    fn load(&self, id: Uuid) -> Result<Statement, ProcessError> {
        self.store
            .statement(id)?
            .ok_or(ProcessError::StatementNotFound(id))
    }
}

/// Blocking half of processing: text, account linking, extraction.
fn extract<S: StatementStore>(
    pipeline: &StatementExtractionPipeline,
    store: &S,
    document: &[u8],
    mut statement: Statement,
    account: Option<Account>,
) -> Result<(Statement, Option<Account>, ExtractionOutcome), ProcessError> {
    let text = pipeline.extract_text(document)?;
    let institution = pipeline.classify(&text.text);

    let linked_here = account.is_none();
    let mut account = match account {
        Some(a) => Some(a),
        None => link_account(pipeline, store, &text.text, institution, &mut statement)?,
    };

    let mut outcome = pipeline.extract(&text.text, institution, &mut statement, account.as_mut());
    // The issuer pass decides checking vs card; card is only the fallback.
    if linked_here {
        if let Some(a) = account.as_mut() {
            a.metadata.account_type.get_or_insert(AccountType::CreditCard);
        }
    }
    outcome.source = Some(text.source);
    Ok((statement, account, outcome))
}

/// Find the account this statement belongs to by institution and last four
/// digits, creating one when nothing matches. GENERIC documents stay
/// unlinked.
fn link_account<S: StatementStore>(
    pipeline: &StatementExtractionPipeline,
    store: &S,
    text: &str,
    institution: InstitutionCode,
    statement: &mut Statement,
) -> Result<Option<Account>, ProcessError> {
    if institution == InstitutionCode::Generic {
        info!(statement = %statement.id, "institution not recognised, statement stays unlinked");
        return Ok(None);
    }

    let last4 = match LAST4.captures(text).and_then(|c| c.get(1)) {
        Some(m) => Some(m.as_str().to_string()),
        None => {
            let mut scratch = AccountMetadata::default();
            pipeline
                .registry()
                .get(institution)
                .extract_account_metadata(text, &mut scratch);
            scratch.last4
        }
    };

    if let Some(l4) = last4.as_deref() {
        let existing = store.accounts_by_institution(institution)?;
        if let Some(found) = existing
            .into_iter()
            .find(|a| a.metadata.last4.as_deref() == Some(l4))
        {
            info!(%institution, account = %found.name, "statement linked by last four digits");
            statement.account_id = Some(found.id);
            store.save_statement(statement)?;
            return Ok(Some(found));
        }
    }

    let Some(mut account) = Account::for_institution(institution, last4.as_deref()) else {
        return Ok(None);
    };
    store.save_account(&account)?;
    statement.account_id = Some(account.id);
    store.save_statement(statement)?;
    info!(%institution, account = %account.name, "account created for statement");
    Ok(Some(account))
}
