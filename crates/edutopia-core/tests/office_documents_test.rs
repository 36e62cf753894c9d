//! Text extraction from Office archives

use edutopia_core::ocr::office::{docx_text, pptx_slide_texts};
use edutopia_core::EdutopiaError;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn write_archive(path: &Path, entries: &[(&str, &str)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in entries {
        zip.start_file(*name, zip::write::FileOptions::default())
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn slide(text: &str) -> String {
    format!(
        r#"<p:sld><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p><a:p></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
        text
    )
}

#[test]
fn test_slides_follow_numeric_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deck.pptx");
    let (one, two, ten) = (slide("Intro"), slide("Cells &amp; tissues"), slide("Summary"));
    write_archive(
        &path,
        &[
            ("ppt/slides/slide10.xml", &ten),
            ("ppt/slides/slide2.xml", &two),
            ("ppt/slides/slide1.xml", &one),
            ("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>"),
        ],
    );

    let slides = pptx_slide_texts(&path).unwrap();
    assert_eq!(slides, vec!["Intro", "Cells & tissues", "Summary"]);
}

#[test]
fn test_presentation_without_slides_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.pptx");
    write_archive(&path, &[("ppt/presentation.xml", "<p:presentation/>")]);

    assert!(matches!(
        pptx_slide_texts(&path),
        Err(EdutopiaError::InvalidInput(_))
    ));
}

#[test]
fn test_archive_without_word_document_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.docx");
    write_archive(&path, &[("content.xml", "<doc/>")]);

    assert!(matches!(docx_text(&path), Err(EdutopiaError::InvalidInput(_))));
}
