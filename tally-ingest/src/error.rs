use thiserror::Error;

/// Failures that stop a statement from being read at all.
///
/// Lines that match no pattern and metadata that cannot be found are not
/// errors; extractors skip them.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(
        "This PDF has no text layer and Tesseract OCR is not installed. \
         Install it (brew install tesseract / apt install tesseract-ocr) and reprocess the statement."
    )]
    NoExtractableText,

    #[error("invalid PDF: {0}")]
    InvalidPdf(#[from] lopdf::Error),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
