//! Bridge to the external OCR toolchain for image-only statements.
//!
//! Pages are rasterized one at a time with `pdftoppm` into a scratch
//! directory and each image is fed to `tesseract`. Only one page image
//! exists on disk at any moment. A page that fails to rasterize or recognize
//! is logged and skipped.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::error::ExtractError;

#[derive(Debug, Clone)]
pub struct OcrEngine {
    tesseract: PathBuf,
    rasterizer: PathBuf,
    dpi: u32,
    psm: u8,
    language: String,
}

impl OcrEngine {
    /// Find a working tesseract (first candidate that answers `--version`)
    /// and the rasterizer. `None` when either is missing.
    pub fn discover(config: &OcrConfig) -> Option<Self> {
        let tesseract = config
            .tesseract_candidates
            .iter()
            .filter_map(|c| locate(c))
            .find(|path| responds_to_version(path));
        let Some(tesseract) = tesseract else {
            warn!(candidates = ?config.tesseract_candidates, "tesseract not found");
            return None;
        };

        let Some(rasterizer) = locate(&config.rasterizer) else {
            warn!(rasterizer = %config.rasterizer, "page rasterizer not found (install poppler-utils)");
            return None;
        };

        debug!(tesseract = %tesseract.display(), rasterizer = %rasterizer.display(), "OCR toolchain found");
        Some(Self {
            tesseract,
            rasterizer,
            dpi: config.dpi,
            psm: config.page_segmentation_mode,
            language: config.language.clone(),
        })
    }

    /// OCR every page of `pdf`, joining page texts with newlines.
    pub fn recognize(&self, pdf: &[u8], pages: usize) -> Result<String, ExtractError> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("statement.pdf");
        fs::write(&input, pdf)?;

        info!(pages, dpi = self.dpi, "running OCR");
        let mut out = Vec::with_capacity(pages);
        for page in 1..=pages {
            match self.recognize_page(&input, scratch.path(), page) {
                Ok(text) => {
                    debug!(page, chars = text.len(), "OCR page done");
                    out.push(text);
                }
                Err(e) => warn!(page, "OCR failed for page: {e}"),
            }
        }
        Ok(out.join("\n"))
    }

    fn recognize_page(&self, input: &Path, dir: &Path, page: usize) -> Result<String, ExtractError> {
        let prefix = format!("page{page:04}");
        let page_arg = page.to_string();
        let output = Command::new(&self.rasterizer)
            .args(["-f", &page_arg, "-l", &page_arg, "-r", &self.dpi.to_string(), "-png"])
            .arg(input)
            .arg(dir.join(&prefix))
            .output()?;
        if !output.status.success() {
            return Err(ExtractError::Ocr(format!(
                "{} exited with {}: {}",
                self.rasterizer.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // pdftoppm appends "-N" (zero-padded to the page count's width)
        let image = find_page_image(dir, &prefix)?
            .ok_or_else(|| ExtractError::Ocr(format!("no image produced for page {page}")))?;

        let result = Command::new(&self.tesseract)
            .arg(&image)
            .arg("stdout")
            .args(["--psm", &self.psm.to_string(), "-l", &self.language])
            .output();
        let _ = fs::remove_file(&image);
        let result = result?;

        if !result.status.success() {
            return Err(ExtractError::Ocr(format!(
                "tesseract exited with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&result.stdout).into_owned())
    }
}

fn find_page_image(dir: &Path, prefix: &str) -> Result<Option<PathBuf>, ExtractError> {
    let wanted = format!("{prefix}-");
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(&wanted) && name.ends_with(".png") {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

/// Absolute/relative paths must exist; bare names go through PATH.
fn locate(candidate: &str) -> Option<PathBuf> {
    let path = Path::new(candidate);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }
    which::which(candidate).ok()
}

fn responds_to_version(path: &Path) -> bool {
    Command::new(path)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
