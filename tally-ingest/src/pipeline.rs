//! PDF bytes → classified, extracted statement.
//!
//! Text extraction, classification and dispatch are exposed separately so a
//! caller can look at the text (for account linking, say) before choosing
//! which account the transactions belong to.

use serde::Serialize;
use tally_core::{Account, AccountMetadata, InstitutionCode, Statement, Transaction};
use tracing::{info, warn};

use crate::classify::InstitutionClassifier;
use crate::config::ExtractionConfig;
use crate::dispatch::ExtractorRegistry;
use crate::error::ExtractError;
use crate::pdf::TextExtractor;
use crate::types::{ExtractedText, TextSource};

/// What one run produced besides the in-place statement/account writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionOutcome {
    pub institution: InstitutionCode,
    /// `None` when the caller supplied text directly
    pub source: Option<TextSource>,
    pub transactions: Vec<Transaction>,
    /// Account fields found in the document. When an account was passed in
    /// this is its metadata after the update.
    pub metadata: AccountMetadata,
    /// The dedicated extractor found nothing and the generic one was used
    pub used_fallback: bool,
}

pub struct StatementExtractionPipeline {
    text: TextExtractor,
    classifier: InstitutionClassifier,
    registry: ExtractorRegistry,
}

impl Default for StatementExtractionPipeline {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl StatementExtractionPipeline {
    pub fn new(config: ExtractionConfig) -> Self {
        let tz = config.tz();
        Self {
            classifier: InstitutionClassifier::new(&config.classifier),
            registry: ExtractorRegistry::new(tz),
            text: TextExtractor::new(config),
        }
    }

    pub fn extract_text(&self, pdf: &[u8]) -> Result<ExtractedText, ExtractError> {
        self.text.extract(pdf)
    }

    pub fn classify(&self, text: &str) -> InstitutionCode {
        self.classifier.classify(text)
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Full run over a PDF. The only error is a document with no readable
    /// text; everything past text extraction is best effort.
    pub fn run(
        &self,
        pdf: &[u8],
        statement: &mut Statement,
        account: Option<&mut Account>,
    ) -> Result<ExtractionOutcome, ExtractError> {
        let extracted = self.extract_text(pdf)?;
        let mut outcome = self.run_text(&extracted.text, statement, account);
        outcome.source = Some(extracted.source);
        Ok(outcome)
    }

    /// Classify and extract already-recovered text.
    pub fn run_text(
        &self,
        text: &str,
        statement: &mut Statement,
        account: Option<&mut Account>,
    ) -> ExtractionOutcome {
        let institution = self.classify(text);
        self.extract(text, institution, statement, account)
    }

    /// Dispatch on a known institution. Metadata is always read; when the
    /// dedicated extractor yields no transactions the generic extractor runs
    /// over the same text.
    pub fn extract(
        &self,
        text: &str,
        institution: InstitutionCode,
        statement: &mut Statement,
        account: Option<&mut Account>,
    ) -> ExtractionOutcome {
        let extractor = self.registry.get(institution);
        info!(institution = %institution, file = %statement.file_name, "extracting statement");

        let mut scratch = AccountMetadata::default();
        let account = match account {
            Some(a) => {
                extractor.extract_account_metadata(text, &mut a.metadata);
                Some(&*a)
            }
            None => {
                extractor.extract_account_metadata(text, &mut scratch);
                None
            }
        };
        let metadata = account.map_or(scratch, |a| a.metadata.clone());

        let mut transactions = extractor.extract_transactions(text, statement, account);
        let mut used_fallback = false;
        if transactions.is_empty() && extractor.institution() != InstitutionCode::Generic {
            warn!(institution = %institution, "no transactions found, falling back to generic extractor");
            transactions = self.registry.generic().extract_transactions(text, statement, account);
            used_fallback = true;
        }

        info!(institution = %institution, count = transactions.len(), used_fallback, "extraction finished");
        ExtractionOutcome {
            institution,
            source: None,
            transactions,
            metadata,
            used_fallback,
        }
    }
}
