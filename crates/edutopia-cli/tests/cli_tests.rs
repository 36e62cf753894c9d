//! Integration tests for the edutopia binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn edutopia_cmd(dir: &TempDir) -> Command {
    let config = dir.path().join("config.yml");
    fs::write(
        &config,
        "ocr:\n  soffice_cmd: edutopia-missing-soffice\n  tesseract_cmd: edutopia-missing-tesseract\n",
    )
    .unwrap();
    let mut cmd = Command::cargo_bin("edutopia").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

fn write_package(path: &Path, entries: &[(&str, &str)]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in entries {
        zip.start_file(*name, zip::write::FileOptions::default())
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:r><w:t>Photosynthesis</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Plants turn light </w:t></w:r><w:r><w:t>into sugar &amp; oxygen.</w:t></w:r></w:p>
</w:body></w:document>"#;

fn slide_xml(text: &str) -> String {
    format!(
        r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
        text
    )
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    edutopia_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("questions"))
        .stdout(predicate::str::contains("diagrams"));
}

#[test]
fn test_ocr_docx_writes_text_file() {
    let dir = TempDir::new().unwrap();
    let docx = dir.path().join("biology.docx");
    write_package(&docx, &[("word/document.xml", DOCUMENT_XML)]);
    let out = dir.path().join("out");

    edutopia_cmd(&dir)
        .arg("ocr")
        .arg(&docx)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Photosynthesis\nPlants turn light into sugar & oxygen.",
        ));

    let text = fs::read_to_string(out.join("biology_ocr.txt")).unwrap();
    assert_eq!(text, "Photosynthesis\nPlants turn light into sugar & oxygen.");
}

#[test]
fn test_ocr_pptx_falls_back_to_slide_text() {
    let dir = TempDir::new().unwrap();
    let pptx = dir.path().join("deck.pptx");
    let first = slide_xml("Cell structure");
    let second = slide_xml("Mitochondria");
    let tenth = slide_xml("Summary");
    write_package(
        &pptx,
        &[
            ("ppt/slides/slide10.xml", tenth.as_str()),
            ("ppt/slides/slide2.xml", second.as_str()),
            ("ppt/slides/slide1.xml", first.as_str()),
            ("ppt/presentation.xml", "<p:presentation/>"),
        ],
    );
    let out = dir.path().join("out");

    let assert = edutopia_cmd(&dir)
        .arg("--format")
        .arg("json")
        .arg("ocr")
        .arg(&pptx)
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let output: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(output["kind"], "pptx");
    let pages = output["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0]["text"], "Cell structure");
    assert_eq!(pages[2]["text"], "Summary");
    assert!(out.join("text/deck_slide_2.txt").exists());

    let combined = fs::read_to_string(out.join("text/deck_combined.txt")).unwrap();
    assert!(combined.contains("\nSlide 2\n"));
}

#[test]
fn test_ocr_exit_codes() {
    let dir = TempDir::new().unwrap();

    edutopia_cmd(&dir)
        .arg("ocr")
        .arg(dir.path().join("missing.pdf"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));

    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "plain text").unwrap();
    edutopia_cmd(&dir)
        .arg("ocr")
        .arg(&notes)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Unsupported file type"));
}

#[test]
fn test_questions_rejects_empty_file() {
    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("empty.txt");
    fs::write(&empty, "   \n").unwrap();

    edutopia_cmd(&dir)
        .arg("questions")
        .arg("--file")
        .arg(&empty)
        .assert()
        .code(3);
}

#[test]
fn test_summarize_requires_a_source() {
    let dir = TempDir::new().unwrap();
    edutopia_cmd(&dir).arg("summarize").assert().failure();
}
