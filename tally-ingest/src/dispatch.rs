//! Institution code → extractor.

use chrono_tz::Tz;
use tally_core::InstitutionCode;
use tracing::debug;

use crate::parsers::{
    AmexExtractor, BankOfAmericaExtractor, CapitalOneExtractor, ChaseExtractor, CitiExtractor,
    DiscoverExtractor, GenericExtractor, GoldmanSachsExtractor, StatementExtractor,
    WellsFargoExtractor,
};

/// Every issuer extractor plus the generic fallback, built once and shared
/// across documents.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn StatementExtractor>>,
    generic: GenericExtractor,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new(chrono_tz::America::Chicago)
    }
}

impl ExtractorRegistry {
    pub fn new(tz: Tz) -> Self {
        let extractors: Vec<Box<dyn StatementExtractor>> = vec![
            Box::new(AmexExtractor::new(tz)),
            Box::new(ChaseExtractor::new(tz)),
            Box::new(CitiExtractor::new(tz)),
            Box::new(WellsFargoExtractor::new(tz)),
            Box::new(CapitalOneExtractor::new(tz)),
            Box::new(DiscoverExtractor::new(tz)),
            Box::new(BankOfAmericaExtractor::new(tz)),
            Box::new(GoldmanSachsExtractor::new(tz)),
        ];
        Self {
            extractors,
            generic: GenericExtractor::new(tz),
        }
    }

    /// The extractor that supports `code`, else the generic one.
    pub fn get(&self, code: InstitutionCode) -> &dyn StatementExtractor {
        match self.extractors.iter().find(|e| e.supports(code)) {
            Some(e) => e.as_ref(),
            None => {
                debug!(institution = %code, "no dedicated extractor, using generic");
                &self.generic
            }
        }
    }

    pub fn generic(&self) -> &dyn StatementExtractor {
        &self.generic
    }
}
