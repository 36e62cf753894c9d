//! External OCR, rasterization and document conversion tools

use crate::command;
use crate::error::{EdutopiaError, Result};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Recognizes text in an image file
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &Path) -> Result<String>;
}

/// Renders each PDF page to an image file
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Page images in page order
    async fn rasterize(&self, pdf: &Path, dir: &Path) -> Result<Vec<PathBuf>>;
}

/// The `tesseract` command-line engine
#[derive(Debug, Clone)]
pub struct TesseractCli {
    cmd: String,
    language: String,
    timeout: Duration,
}

impl TesseractCli {
    pub fn new(cmd: impl Into<String>, language: impl Into<String>, timeout: Duration) -> Self {
        Self {
            cmd: cmd.into(),
            language: language.into(),
            timeout,
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn recognize(&self, image: &Path) -> Result<String> {
        let args: [&OsStr; 4] = [
            image.as_os_str(),
            OsStr::new("stdout"),
            OsStr::new("-l"),
            OsStr::new(&self.language),
        ];
        let stdout = command::run(&self.cmd, args, self.timeout).await?;
        Ok(String::from_utf8_lossy(&stdout).trim_end().to_string())
    }
}

/// Poppler's `pdftoppm`, writing JPEG pages
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    cmd: String,
    dpi: u32,
    timeout: Duration,
}

impl Pdftoppm {
    pub fn new(cmd: impl Into<String>, dpi: u32, timeout: Duration) -> Self {
        Self {
            cmd: cmd.into(),
            dpi,
            timeout,
        }
    }
}

#[async_trait]
impl Rasterizer for Pdftoppm {
    async fn rasterize(&self, pdf: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dir).await?;
        let dpi = self.dpi.to_string();
        let prefix = dir.join("page");
        let args: [&OsStr; 5] = [
            OsStr::new("-r"),
            OsStr::new(&dpi),
            OsStr::new("-jpeg"),
            pdf.as_os_str(),
            prefix.as_os_str(),
        ];
        command::run(&self.cmd, args, self.timeout).await?;

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(number) = page_number(&path) {
                pages.push((number, path));
            }
        }
        pages.sort_by_key(|(number, _)| *number);
        Ok(pages.into_iter().map(|(_, path)| path).collect())
    }
}

/// Page number of a `page-<n>.jpg` file; pdftoppm zero-pads to the page count width
fn page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    if !matches!(ext, "jpg" | "jpeg") {
        return None;
    }
    stem.strip_prefix("page-")?.parse().ok()
}

/// LibreOffice in headless mode, used to turn presentations into PDF
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    cmd: String,
    timeout: Duration,
}

impl OfficeConverter {
    pub fn new(cmd: impl Into<String>, timeout: Duration) -> Self {
        Self {
            cmd: cmd.into(),
            timeout,
        }
    }

    /// Convert `document` to PDF inside `dir`, returning the PDF path
    pub async fn to_pdf(&self, document: &Path, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let args: [&OsStr; 6] = [
            OsStr::new("--headless"),
            OsStr::new("--convert-to"),
            OsStr::new("pdf"),
            OsStr::new("--outdir"),
            dir.as_os_str(),
            document.as_os_str(),
        ];
        command::run(&self.cmd, args, self.timeout).await?;

        let stem = document
            .file_stem()
            .ok_or_else(|| EdutopiaError::InvalidInput(format!("No file name in {:?}", document)))?;
        let mut name = stem.to_os_string();
        name.push(".pdf");
        let pdf = dir.join(name);
        if !pdf.exists() {
            return Err(EdutopiaError::tool(
                &self.cmd,
                format!("no PDF produced for {}", document.display()),
            ));
        }
        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number() {
        assert_eq!(page_number(Path::new("/tmp/page-1.jpg")), Some(1));
        assert_eq!(page_number(Path::new("/tmp/page-012.jpg")), Some(12));
        assert_eq!(page_number(Path::new("/tmp/page-3.png")), None);
        assert_eq!(page_number(Path::new("/tmp/cover.jpg")), None);
    }

    #[tokio::test]
    async fn test_missing_tesseract_reports_tool() {
        let engine = TesseractCli::new("edutopia-missing-tesseract", "eng", Duration::from_secs(5));
        let err = engine.recognize(Path::new("x.png")).await.unwrap_err();
        assert!(matches!(err, EdutopiaError::ExternalTool { .. }));
    }
}
