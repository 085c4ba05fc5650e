//! Optical character recognition over rendered document pages.
//!
//! OCR is modeled as a capability: render one page of a document to an
//! image and recognize its text. The production engine drives the external
//! poppler `pdftoppm` renderer and the `tesseract` CLI; tests substitute a
//! stub engine so no external binary is required to exercise the
//! page-classification policy in [`crate::extract`].

use std::fmt;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;
use tracing::debug;

/// OCR engine failures. Either stage failing is fatal for the document.
#[derive(Debug, Clone)]
pub enum OcrError {
    /// The page could not be rendered to an image.
    Render(String),
    /// The rendered image could not be recognized.
    Recognize(String),
}

impl fmt::Display for OcrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrError::Render(e) => write!(f, "page render failed: {}", e),
            OcrError::Recognize(e) => write!(f, "text recognition failed: {}", e),
        }
    }
}

impl std::error::Error for OcrError {}

/// Renders a single document page and recognizes its text.
pub trait OcrEngine {
    /// Recognize the text of 1-based page `page` of `document`.
    fn recognize_page(&self, document: &Path, page: usize) -> Result<String, OcrError>;
}

/// OCR via `pdftoppm` + `tesseract`, with a fixed recognition language.
pub struct TesseractOcr {
    lang: String,
    dpi: u32,
}

impl TesseractOcr {
    pub fn new(lang: impl Into<String>, dpi: u32) -> Self {
        Self {
            lang: lang.into(),
            dpi,
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize_page(&self, document: &Path, page: usize) -> Result<String, OcrError> {
        let scratch = TempDir::new().map_err(|e| OcrError::Render(e.to_string()))?;
        let prefix = scratch.path().join("page");

        let render = Command::new("pdftoppm")
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg("-singlefile")
            .arg(document)
            .arg(&prefix)
            .output()
            .map_err(|e| OcrError::Render(format!("could not run pdftoppm: {}", e)))?;
        if !render.status.success() {
            return Err(OcrError::Render(format!(
                "pdftoppm exited with {}: {}",
                render.status,
                String::from_utf8_lossy(&render.stderr).trim()
            )));
        }

        let image = prefix.with_extension("png");
        debug!(page, lang = %self.lang, "recognizing rendered page");

        let recognize = Command::new("tesseract")
            .arg(&image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .output()
            .map_err(|e| OcrError::Recognize(format!("could not run tesseract: {}", e)))?;
        if !recognize.status.success() {
            return Err(OcrError::Recognize(format!(
                "tesseract exited with {}: {}",
                recognize.status,
                String::from_utf8_lossy(&recognize.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&recognize.stdout).into_owned())
    }
}
