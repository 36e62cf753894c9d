//! Document-to-text pipeline

use super::engine::{OcrEngine, OfficeConverter, Pdftoppm, Rasterizer, TesseractCli};
use super::office;
use super::DocumentKind;
use crate::config::OcrConfig;
use crate::error::{EdutopiaError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const RULE_WIDTH: usize = 50;

/// Text recognized on one page or slide
#[derive(Debug, Clone, Serialize)]
pub struct PageText {
    pub number: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OcrOutput {
    pub kind: DocumentKind,
    pub combined_text: String,
    pub pages: Vec<PageText>,
    pub text_dir: PathBuf,
    /// Set when page images were written
    pub images_dir: Option<PathBuf>,
}

pub struct OcrPipeline {
    engine: Arc<dyn OcrEngine>,
    rasterizer: Arc<dyn Rasterizer>,
    converter: OfficeConverter,
    config: OcrConfig,
}

impl OcrPipeline {
    pub fn new(
        engine: Arc<dyn OcrEngine>,
        rasterizer: Arc<dyn Rasterizer>,
        converter: OfficeConverter,
        config: OcrConfig,
    ) -> Self {
        Self {
            engine,
            rasterizer,
            converter,
            config,
        }
    }

    /// Pipeline backed by the command-line tools named in the config
    pub fn from_config(config: &OcrConfig) -> Self {
        let timeout = Duration::from_secs(config.tool_timeout_secs);
        Self::new(
            Arc::new(TesseractCli::new(
                &config.tesseract_cmd,
                &config.language,
                timeout,
            )),
            Arc::new(Pdftoppm::new(&config.pdftoppm_cmd, config.dpi, timeout)),
            OfficeConverter::new(&config.soffice_cmd, timeout),
            config.clone(),
        )
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Whether an upload with this name may be processed
    pub fn is_allowed(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => self
                .config
                .allowed_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    /// Extract text from any supported document
    pub async fn process_file(&self, path: &Path, output_dir: &Path) -> Result<OcrOutput> {
        if !tokio::fs::try_exists(path).await? {
            return Err(EdutopiaError::NotFound(format!(
                "File '{}' does not exist",
                path.display()
            )));
        }

        let kind = DocumentKind::from_path(path)?;
        tracing::info!("Processing {} as {:?}", path.display(), kind);
        match kind {
            DocumentKind::Pdf => self.process_pdf(path, output_dir).await,
            DocumentKind::Image => self.process_image(path, output_dir).await,
            DocumentKind::Docx => self.process_docx(path, output_dir).await,
            DocumentKind::Pptx => self.process_pptx(path, output_dir).await,
        }
    }

    pub async fn process_pdf(&self, path: &Path, output_dir: &Path) -> Result<OcrOutput> {
        let stem = file_stem(path)?;
        let text_dir = output_dir.join("text");
        tokio::fs::create_dir_all(&text_dir).await?;

        if self.config.prefer_text_layer {
            if let Some(pages) = text_layer(path).await? {
                tracing::info!("Using embedded text layer ({} pages)", pages.len());
                return write_pages(DocumentKind::Pdf, &stem, "page", "Page", pages, text_dir, None)
                    .await;
            }
            tracing::debug!("No usable text layer, falling back to OCR");
        }

        let images_dir = output_dir.join("images");
        let pages = self.ocr_pdf_pages(path, &stem, "page", &images_dir).await?;
        write_pages(
            DocumentKind::Pdf,
            &stem,
            "page",
            "Page",
            pages,
            text_dir,
            Some(images_dir),
        )
        .await
    }

    pub async fn process_image(&self, path: &Path, output_dir: &Path) -> Result<OcrOutput> {
        let text = self.engine.recognize(path).await?;
        write_single(DocumentKind::Image, path, text, output_dir).await
    }

    pub async fn process_docx(&self, path: &Path, output_dir: &Path) -> Result<OcrOutput> {
        let owned = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || office::docx_text(&owned))
            .await
            .map_err(|e| EdutopiaError::Other(e.into()))??;
        write_single(DocumentKind::Docx, path, text, output_dir).await
    }

    /// Render slides through LibreOffice and OCR them, or read the slide XML
    /// when the converter is unavailable
    pub async fn process_pptx(&self, path: &Path, output_dir: &Path) -> Result<OcrOutput> {
        let stem = file_stem(path)?;
        let text_dir = output_dir.join("text");
        let images_dir = output_dir.join("images");
        tokio::fs::create_dir_all(&text_dir).await?;

        let scratch = tempfile::tempdir()?;
        match self.converter.to_pdf(path, scratch.path()).await {
            Ok(pdf) => {
                let slides = self.ocr_pdf_pages(&pdf, &stem, "slide", &images_dir).await?;
                write_pages(
                    DocumentKind::Pptx,
                    &stem,
                    "slide",
                    "Slide",
                    slides,
                    text_dir,
                    Some(images_dir),
                )
                .await
            }
            Err(EdutopiaError::ExternalTool { tool, message }) => {
                tracing::warn!(
                    "{} unavailable ({}), extracting slide text directly",
                    tool,
                    message
                );
                let owned = path.to_path_buf();
                let slides = tokio::task::spawn_blocking(move || office::pptx_slide_texts(&owned))
                    .await
                    .map_err(|e| EdutopiaError::Other(e.into()))??;
                write_pages(DocumentKind::Pptx, &stem, "slide", "Slide", slides, text_dir, None)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    /// Rasterize a PDF, keep each page image as `{stem}_{label}_{n}.jpg` and OCR it
    async fn ocr_pdf_pages(
        &self,
        pdf: &Path,
        stem: &str,
        label: &str,
        images_dir: &Path,
    ) -> Result<Vec<String>> {
        tokio::fs::create_dir_all(images_dir).await?;
        let scratch = tempfile::tempdir()?;
        let rendered = self.rasterizer.rasterize(pdf, scratch.path()).await?;
        tracing::info!("Rendered {} pages from {}", rendered.len(), pdf.display());

        let mut texts = Vec::with_capacity(rendered.len());
        for (i, page) in rendered.iter().enumerate() {
            let number = i + 1;
            tracing::debug!("Recognizing {} {}/{}", label, number, rendered.len());
            let kept = images_dir.join(format!("{}_{}_{}.jpg", stem, label, number));
            tokio::fs::copy(page, &kept).await?;
            texts.push(self.engine.recognize(&kept).await?);
        }
        Ok(texts)
    }
}

/// Reduce an uploaded filename to a safe single path component.
///
/// The stem and extension are cleaned separately; `fallback_stem` replaces a
/// stem with no usable characters left.
pub fn sanitize_filename(name: &str, fallback_stem: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, extension) = match base.rfind('.') {
        Some(dot) if dot > 0 => (&base[..dot], &base[dot + 1..]),
        _ => (base, ""),
    };

    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(*c, '.' | '_' | '-'))
        .collect();
    let stem = match cleaned.trim_start_matches(['.', '_']) {
        "" => fallback_stem,
        stem => stem,
    };

    let extension: String = extension
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| EdutopiaError::InvalidInput(format!("No file name in {:?}", path)))
}

fn page_block(heading: &str, number: usize, text: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!("\n{rule}\n{heading} {number}\n{rule}\n\n{text}\n")
}

async fn write_pages(
    kind: DocumentKind,
    stem: &str,
    label: &str,
    heading: &str,
    texts: Vec<String>,
    text_dir: PathBuf,
    images_dir: Option<PathBuf>,
) -> Result<OcrOutput> {
    let mut combined = String::new();
    let mut pages = Vec::with_capacity(texts.len());
    for (i, text) in texts.into_iter().enumerate() {
        let number = i + 1;
        tokio::fs::write(text_dir.join(format!("{}_{}_{}.txt", stem, label, number)), &text)
            .await?;
        combined.push_str(&page_block(heading, number, &text));
        pages.push(PageText { number, text });
    }

    let combined_path = text_dir.join(format!("{}_combined.txt", stem));
    tokio::fs::write(&combined_path, &combined).await?;
    tracing::info!("Combined text written to {}", combined_path.display());

    Ok(OcrOutput {
        kind,
        combined_text: combined,
        pages,
        text_dir,
        images_dir,
    })
}

async fn write_single(
    kind: DocumentKind,
    path: &Path,
    text: String,
    output_dir: &Path,
) -> Result<OcrOutput> {
    let stem = file_stem(path)?;
    tokio::fs::create_dir_all(output_dir).await?;
    let text_path = output_dir.join(format!("{}_ocr.txt", stem));
    tokio::fs::write(&text_path, &text).await?;
    tracing::info!("Text written to {}", text_path.display());

    Ok(OcrOutput {
        kind,
        combined_text: text.clone(),
        pages: vec![PageText { number: 1, text }],
        text_dir: output_dir.to_path_buf(),
        images_dir: None,
    })
}

/// Per-page text from the PDF's embedded text layer, if it has any
async fn text_layer(path: &Path) -> Result<Option<Vec<String>>> {
    let bytes = tokio::fs::read(path).await?;
    let display = path.display().to_string();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| EdutopiaError::Other(e.into()))?
        .map_err(|e| {
            EdutopiaError::Parse(format!("Failed to extract text from PDF {}: {}", display, e))
        })?;

    if text.trim().is_empty() {
        return Ok(None);
    }
    let mut pages: Vec<String> = text.split('\x0c').map(|p| p.trim().to_string()).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.is_empty()) {
        pages.pop();
    }
    Ok(Some(pages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NamedEngine;

    #[async_trait]
    impl OcrEngine for NamedEngine {
        async fn recognize(&self, image: &Path) -> Result<String> {
            let name = image.file_name().and_then(|n| n.to_str()).unwrap_or("");
            Ok(format!("text of {}", name))
        }
    }

    struct FakeRasterizer {
        pages: usize,
    }

    #[async_trait]
    impl Rasterizer for FakeRasterizer {
        async fn rasterize(&self, _pdf: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
            let mut out = Vec::new();
            for n in 1..=self.pages {
                let path = dir.join(format!("page-{}.jpg", n));
                tokio::fs::write(&path, b"jpeg").await?;
                out.push(path);
            }
            Ok(out)
        }
    }

    fn pipeline(pages: usize) -> OcrPipeline {
        OcrPipeline::new(
            Arc::new(NamedEngine),
            Arc::new(FakeRasterizer { pages }),
            OfficeConverter::new("edutopia-missing-soffice", Duration::from_secs(5)),
            OcrConfig::default(),
        )
    }

    #[test]
    fn test_page_block_layout() {
        let rule = "=".repeat(50);
        assert_eq!(
            page_block("Page", 2, "hello"),
            format!("\n{rule}\nPage 2\n{rule}\n\nhello\n")
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("notes.pdf", "upload"), "notes.pdf");
        assert_eq!(
            sanitize_filename("../../etc/my notes.pdf", "upload"),
            "my_notes.pdf"
        );
        assert_eq!(sanitize_filename("C:\\tmp\\a.png", "upload"), "a.png");
        assert_eq!(sanitize_filename(".hidden", "upload"), "hidden");
        assert_eq!(sanitize_filename("...", "upload"), "upload");
    }

    #[test]
    fn test_sanitize_keeps_extension_of_non_ascii_name() {
        let name = sanitize_filename("日本語.pdf", "3f2a");
        assert_eq!(name, "3f2a.pdf");
        assert_eq!(
            DocumentKind::from_path(Path::new(&name)).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(sanitize_filename("résumé scan.PNG", "x"), "rsum_scan.PNG");
        assert_eq!(sanitize_filename("__.docx", "x"), "x.docx");
    }

    #[test]
    fn test_is_allowed() {
        let pipeline = pipeline(1);
        assert!(pipeline.is_allowed("slides.PPTX"));
        assert!(pipeline.is_allowed("scan.jpeg"));
        assert!(!pipeline.is_allowed("script.sh"));
        assert!(!pipeline.is_allowed("pdf"));
    }

    #[tokio::test]
    async fn test_process_pdf_writes_pages_and_combined() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("lecture.pdf");
        tokio::fs::write(&pdf, b"%PDF-1.4").await.unwrap();
        let out_dir = dir.path().join("out");

        let output = pipeline(2).process_file(&pdf, &out_dir).await.unwrap();
        assert_eq!(output.kind, DocumentKind::Pdf);
        assert_eq!(output.pages.len(), 2);
        assert_eq!(output.pages[1].text, "text of lecture_page_2.jpg");
        assert!(out_dir.join("images/lecture_page_1.jpg").exists());
        assert!(out_dir.join("text/lecture_page_2.txt").exists());

        let combined = std::fs::read_to_string(out_dir.join("text/lecture_combined.txt")).unwrap();
        assert_eq!(combined, output.combined_text);
        assert!(combined.contains("\nPage 1\n"));
        assert!(combined.ends_with("text of lecture_page_2.jpg\n"));
    }

    #[tokio::test]
    async fn test_process_image_writes_ocr_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("board.png");
        tokio::fs::write(&image, b"png").await.unwrap();

        let output = pipeline(0).process_file(&image, dir.path()).await.unwrap();
        assert_eq!(output.combined_text, "text of board.png");
        let written = std::fs::read_to_string(dir.path().join("board_ocr.txt")).unwrap();
        assert_eq!(written, "text of board.png");
        assert!(output.images_dir.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_and_unsupported_kind() {
        let dir = tempfile::tempdir().unwrap();
        let err = pipeline(0)
            .process_file(&dir.path().join("absent.pdf"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, EdutopiaError::NotFound(_)));

        let script = dir.path().join("run.sh");
        tokio::fs::write(&script, b"echo").await.unwrap();
        let err = pipeline(0).process_file(&script, dir.path()).await.unwrap_err();
        assert!(matches!(err, EdutopiaError::InvalidInput(_)));
    }
}
