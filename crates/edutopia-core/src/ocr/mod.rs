//! Text extraction from PDFs, images and Office documents

mod engine;
pub mod office;
mod pipeline;

pub use engine::{OcrEngine, OfficeConverter, Pdftoppm, Rasterizer, TesseractCli};
pub use pipeline::{sanitize_filename, OcrOutput, OcrPipeline, PageText};

use crate::error::{EdutopiaError, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Image,
    Docx,
    Pptx,
}

impl DocumentKind {
    /// Classify a file by its extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "png" | "jpg" | "jpeg" => Ok(DocumentKind::Image),
            "docx" => Ok(DocumentKind::Docx),
            "pptx" => Ok(DocumentKind::Pptx),
            other => Err(EdutopiaError::InvalidInput(format!(
                "Unsupported file type: .{}",
                other
            ))),
        }
    }
}
