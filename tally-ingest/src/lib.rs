//! tally-ingest: PDF text extraction (text layer or OCR), institution
//! classification and the per-issuer statement extractors.

pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ocr;
pub mod parsers;
pub mod pdf;
pub mod pipeline;
pub mod types;

pub use classify::InstitutionClassifier;
pub use config::{ClassifierConfig, ExtractionConfig, OcrConfig};
pub use dispatch::ExtractorRegistry;
pub use error::ExtractError;
pub use parsers::StatementExtractor;
pub use pdf::TextExtractor;
pub use pipeline::{ExtractionOutcome, StatementExtractionPipeline};
pub use types::{ExtractedText, TextSource};
