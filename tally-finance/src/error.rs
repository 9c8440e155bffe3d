use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("statement not found: {0}")]
    StatementNotFound(Uuid),

    #[error("account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("no stored document for statement {0}")]
    DocumentMissing(Uuid),

    #[error(transparent)]
    Extraction(#[from] tally_ingest::ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("processing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
