// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Plain text, office XML, HTML and JSON readers

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::{Result, TopicfoldError};

static SCRIPT_OR_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b.*?</(script|style)\s*>").expect("static regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n+").expect("static regex"));

/// First `max_chars` characters of a text file; invalid UTF-8 is replaced
pub fn read_text_prefix(path: &Path, max_chars: usize) -> Result<String> {
    let mut bytes = Vec::new();
    File::open(path)?
        .take((max_chars * 4) as u64)
        .read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).chars().take(max_chars).collect())
}

/// Whole text file; invalid UTF-8 is replaced
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_zip_entry(archive: &mut zip::ZipArchive<File>, name: &str) -> Result<String> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| TopicfoldError::Archive(format!("{}: {}", name, e)))?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

fn open_archive(path: &Path) -> Result<zip::ZipArchive<File>> {
    let file = File::open(path)?;
    zip::ZipArchive::new(file).map_err(|e| TopicfoldError::Archive(format!("{:?}: {}", path, e)))
}

/// Concatenated text runs of an office XML part, one line per paragraph
fn xml_text(xml: &str, text_tag: &[u8], paragraph_tag: &[u8]) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == text_tag => in_text = true,
            Ok(Event::End(e)) => {
                if e.name().as_ref() == text_tag {
                    in_text = false;
                } else if e.name().as_ref() == paragraph_tag {
                    out.push('\n');
                }
            }
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| TopicfoldError::Extraction(format!("Bad XML text: {}", e)))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TopicfoldError::Extraction(format!(
                    "XML error at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(out.trim_end().to_string())
}

/// Paragraph text of a DOCX body
pub fn extract_docx(path: &Path) -> Result<String> {
    let mut archive = open_archive(path)?;
    let xml = read_zip_entry(&mut archive, "word/document.xml")?;
    xml_text(&xml, b"w:t", b"w:p")
}

/// Slide text of a PPTX, in slide order
pub fn extract_pptx(path: &Path) -> Result<String> {
    let mut archive = open_archive(path)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort();

    let mut text = Vec::with_capacity(slides.len());
    for (_, name) in slides {
        let xml = read_zip_entry(&mut archive, &name)?;
        text.push(xml_text(&xml, b"a:t", b"a:p")?);
    }
    Ok(text.join("\n"))
}

/// Visible text of an HTML page
pub fn extract_html(path: &Path) -> Result<String> {
    let html = read_text(path)?;
    Ok(strip_html(&html))
}

fn strip_html(html: &str) -> String {
    let without_code = SCRIPT_OR_STYLE.replace_all(html, " ");
    let text = TAG.replace_all(&without_code, "\n");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    BLANK_LINES.replace_all(&lines.join("\n"), "\n").trim().to_string()
}

/// JSON document re-serialized with indentation
pub fn extract_json(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_docx_paragraphs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.docx");
        write_zip(
            &path,
            &[(
                "word/document.xml",
                r#"<w:document><w:body><w:p><w:r><w:t>자료구조</w:t></w:r><w:r><w:t xml:space="preserve"> 요약</w:t></w:r></w:p><w:p><w:r><w:t>A &amp; B</w:t></w:r></w:p></w:body></w:document>"#,
            )],
        );
        assert_eq!(extract_docx(&path).unwrap(), "자료구조 요약\nA & B");
    }

    #[test]
    fn test_docx_without_body_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.docx");
        write_zip(&path, &[("other.xml", "<x/>")]);
        assert!(matches!(extract_docx(&path), Err(TopicfoldError::Archive(_))));
    }

    #[test]
    fn test_pptx_slides_in_numeric_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deck.pptx");
        write_zip(
            &path,
            &[
                ("ppt/slides/slide10.xml", "<p:sld><a:p><a:t>열번째</a:t></a:p></p:sld>"),
                ("ppt/slides/slide2.xml", "<p:sld><a:p><a:t>두번째</a:t></a:p></p:sld>"),
                ("ppt/slides/_rels/slide2.xml.rels", "<Relationships/>"),
            ],
        );
        assert_eq!(extract_pptx(&path).unwrap(), "두번째\n열번째");
    }

    #[test]
    fn test_html_tags_and_scripts_removed() {
        let html = "<html><head><style>p{}</style><script>var x = 1;</script></head>\
                    <body><h1>정규화</h1><p>1NF &amp; 2NF</p></body></html>";
        assert_eq!(strip_html(html), "정규화\n1NF & 2NF");
    }

    #[test]
    fn test_json_pretty_printed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"topic":"알고리즘"}"#).unwrap();
        assert_eq!(extract_json(&path).unwrap(), "{\n  \"topic\": \"알고리즘\"\n}");
    }

    #[test]
    fn test_text_prefix_handles_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mixed.txt");
        std::fs::write(&path, b"ab\xffcd").unwrap();
        assert_eq!(read_text_prefix(&path, 3).unwrap(), "ab\u{FFFD}");
    }
}
