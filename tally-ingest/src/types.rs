use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// Positioned text from the PDF content streams (plus form fields)
    TextLayer,
    /// Page images run through the external OCR binary
    Ocr,
}

/// Plain text recovered from one PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub source: TextSource,
    pub pages: usize,
}
