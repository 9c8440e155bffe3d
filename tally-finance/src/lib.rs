//! tally-finance: statement processing service (lifecycle, account linking,
//! reprocessing), the repository boundary, per-statement summaries and CSV
//! export.

pub mod error;
pub mod export;
pub mod processor;
pub mod store;
pub mod summary;

pub use error::ProcessError;
pub use export::write_transactions_csv;
pub use processor::{StatementProcessor, Submitted, Upload};
pub use store::{MemoryStore, StatementStore, StoreError};
pub use summary::{CategoryTotal, StatementSummary};
