//! Extraction settings. Serialized as the `[extraction]` table of the CLI's
//! config.toml; every field has a default so partial files load.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Trimmed text shorter than this means the text layer is missing and
    /// OCR takes over.
    pub min_text_chars: usize,
    /// IANA zone used for "today" when a statement has no readable period.
    pub timezone: String,
    pub ocr: OcrConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub dpi: u32,
    /// Tesseract `--psm`; 6 = assume a single uniform block of text
    pub page_segmentation_mode: u8,
    pub language: String,
    /// Tried in order; bare names are looked up on PATH.
    pub tesseract_candidates: Vec<String>,
    /// Page rasterizer (poppler's pdftoppm)
    pub rasterizer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub header_window: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 50,
            timezone: "America/Chicago".to_string(),
            ocr: OcrConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            page_segmentation_mode: 6,
            language: "eng".to_string(),
            tesseract_candidates: vec![
                "/opt/homebrew/bin/tesseract".to_string(),
                "/usr/local/bin/tesseract".to_string(),
                "tesseract".to_string(),
            ],
            rasterizer: "pdftoppm".to_string(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { header_window: 1500 }
    }
}

impl ExtractionConfig {
    /// Configured zone, falling back to America/Chicago on a bad name.
    pub fn tz(&self) -> Tz {
        match tally_core::time::parse_tz(&self.timezone) {
            Ok(tz) => tz,
            Err(e) => {
                tracing::warn!("{e}; using America/Chicago");
                chrono_tz::America::Chicago
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ExtractionConfig::default();
        assert_eq!(cfg.min_text_chars, 50);
        assert_eq!(cfg.ocr.dpi, 300);
        assert_eq!(cfg.ocr.page_segmentation_mode, 6);
        assert_eq!(cfg.ocr.language, "eng");
        assert_eq!(cfg.classifier.header_window, 1500);
        assert_eq!(cfg.tz(), chrono_tz::America::Chicago);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: ExtractionConfig = toml::from_str(
            r#"
min_text_chars = 80

[ocr]
dpi = 200
"#,
        )
        .unwrap();
        assert_eq!(cfg.min_text_chars, 80);
        assert_eq!(cfg.ocr.dpi, 200);
        assert_eq!(cfg.ocr.language, "eng");
        assert_eq!(cfg.classifier.header_window, 1500);
    }

    #[test]
    fn test_bad_timezone_falls_back() {
        let cfg = ExtractionConfig {
            timezone: "Nowhere/Land".into(),
            ..Default::default()
        };
        assert_eq!(cfg.tz(), chrono_tz::America::Chicago);
    }
}
