//! Direct text extraction from Office Open XML packages

use crate::error::{EdutopiaError, Result};
use crate::markup::unescape_entities;
use lazy_static::lazy_static;
use regex::Regex;
use std::io::Read;
use std::path::Path;

lazy_static! {
    static ref WORD_PARAGRAPH: Regex =
        Regex::new(r"(?s)<w:p(?:\s[^>]*)?/>|<w:p(?:\s[^>]*)?>.*?</w:p>").unwrap();
    static ref WORD_RUN: Regex =
        Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab/>|<w:br(?:\s[^>]*)?/>").unwrap();
    static ref DRAWING_PARAGRAPH: Regex =
        Regex::new(r"(?s)<a:p(?:\s[^>]*)?/>|<a:p(?:\s[^>]*)?>.*?</a:p>").unwrap();
    static ref DRAWING_RUN: Regex = Regex::new(r"(?s)<a:t(?:\s[^>]*)?>(.*?)</a:t>").unwrap();
    static ref SLIDE_ENTRY: Regex = Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap();
}

fn open_archive(path: &Path) -> Result<zip::ZipArchive<std::fs::File>> {
    let file = std::fs::File::open(path)?;
    zip::ZipArchive::new(file).map_err(|e| {
        EdutopiaError::InvalidInput(format!(
            "{} is not a valid Office document: {}",
            path.display(),
            e
        ))
    })
}

fn read_entry(archive: &mut zip::ZipArchive<std::fs::File>, name: &str) -> Result<String> {
    let mut entry = archive.by_name(name)?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Paragraph texts of a Word document, one per line
pub fn docx_text(path: &Path) -> Result<String> {
    let mut archive = open_archive(path)?;
    let xml = read_entry(&mut archive, "word/document.xml").map_err(|e| match e {
        EdutopiaError::Zip(_) => {
            EdutopiaError::InvalidInput(format!("{} is not a Word document", path.display()))
        }
        other => other,
    })?;
    Ok(word_paragraphs(&xml).join("\n"))
}

fn word_paragraphs(xml: &str) -> Vec<String> {
    WORD_PARAGRAPH
        .find_iter(xml)
        .map(|paragraph| {
            WORD_RUN
                .captures_iter(paragraph.as_str())
                .map(|run| match run.get(1) {
                    Some(text) => unescape_entities(text.as_str()),
                    None if run[0].starts_with("<w:tab") => "\t".to_string(),
                    None => "\n".to_string(),
                })
                .collect::<String>()
        })
        .collect()
}

/// Text of each slide in slide order, paragraphs joined with newlines
pub fn pptx_slide_texts(path: &Path) -> Result<Vec<String>> {
    let mut archive = open_archive(path)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = SLIDE_ENTRY.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    if slides.is_empty() {
        return Err(EdutopiaError::InvalidInput(format!(
            "{} contains no slides",
            path.display()
        )));
    }
    slides.sort_by_key(|(number, _)| *number);

    let mut texts = Vec::with_capacity(slides.len());
    for (_, name) in slides {
        let xml = read_entry(&mut archive, &name)?;
        let paragraphs: Vec<String> = DRAWING_PARAGRAPH
            .find_iter(&xml)
            .map(|paragraph| {
                DRAWING_RUN
                    .captures_iter(paragraph.as_str())
                    .filter_map(|run| run.get(1))
                    .map(|text| unescape_entities(text.as_str()))
                    .collect::<String>()
            })
            .filter(|text| !text.trim().is_empty())
            .collect();
        texts.push(paragraphs.join("\n"));
    }
    Ok(texts)
}
