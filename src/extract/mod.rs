// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Text extraction from documents, dispatched by extension

pub mod document;
pub mod pdf;
pub mod spreadsheet;

use std::path::Path;
use tracing::debug;

use crate::{Result, TopicfoldError};

/// Characters kept from plain-text files for classification prompts
pub const CLASSIFY_TEXT_CHARS: usize = 3000;

/// Pages read from a PDF for classification prompts
pub const CLASSIFY_PDF_PAGES: usize = 3;

/// Anything that can turn a document into text
pub trait TextExtractor: Send + Sync {
    /// Short text for classification, or `None` when unreadable or unsupported
    fn read_file_data(&self, path: &Path) -> Option<String>;

    /// Full text for content comparison; empty when extraction fails
    fn extract_text(&self, path: &Path) -> String;
}

/// Extractor backed by the format readers in this module
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extensions `read_file_data` understands
    pub fn supported_extensions() -> &'static [&'static str] {
        &[
            "txt", "md", "csv", "docx", "pptx", "pdf", "xlsx", "xls", "ods", "html", "htm", "json",
        ]
    }

    pub fn supports(path: &Path) -> bool {
        Self::supported_extensions().contains(&extension(path).as_str())
    }

    fn read_preview(path: &Path) -> Result<String> {
        let ext = extension(path);
        match ext.as_str() {
            "txt" | "md" | "csv" => document::read_text_prefix(path, CLASSIFY_TEXT_CHARS),
            "docx" => document::extract_docx(path),
            "pptx" => document::extract_pptx(path),
            "pdf" => pdf::extract_pages(path, CLASSIFY_PDF_PAGES),
            "xlsx" | "xls" | "ods" => spreadsheet::extract_workbook(path),
            "html" | "htm" => document::extract_html(path),
            "json" => document::extract_json(path),
            _ => Err(TopicfoldError::UnsupportedFileType(ext)),
        }
    }

    fn read_full(path: &Path) -> Result<String> {
        let ext = extension(path);
        match ext.as_str() {
            "txt" | "md" | "csv" => document::read_text(path),
            "pdf" => pdf::extract_all(path),
            _ => Self::read_preview(path),
        }
    }
}

impl TextExtractor for DocumentExtractor {
    fn read_file_data(&self, path: &Path) -> Option<String> {
        if !Self::supports(path) {
            debug!("No text reader for {:?}", path);
            return None;
        }
        match Self::read_preview(path) {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("Could not read {:?}: {}", path, e);
                None
            }
        }
    }

    fn extract_text(&self, path: &Path) -> String {
        if !Self::supports(path) {
            return String::new();
        }
        Self::read_full(path).unwrap_or_else(|e| {
            debug!("Extraction failed for {:?}: {}", path, e);
            String::new()
        })
    }
}

/// Lower-cased extension without the dot, empty when there is none
pub fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unsupported_is_none() {
        let dir = TempDir::new().unwrap();
        let legacy = dir.path().join("old.doc");
        std::fs::write(&legacy, b"\xd0\xcf\x11\xe0").unwrap();

        let extractor = DocumentExtractor::new();
        assert_eq!(extractor.read_file_data(&legacy), None);
        assert_eq!(extractor.extract_text(&legacy), "");
        assert!(!DocumentExtractor::supports(&legacy));
    }

    #[test]
    fn test_extension_gate() {
        assert!(DocumentExtractor::supports(Path::new("/in/Slides.PPTX")));
        assert!(DocumentExtractor::supports(Path::new("/in/page.htm")));
        assert!(!DocumentExtractor::supports(Path::new("/in/draft.hwp")));
        assert!(!DocumentExtractor::supports(Path::new("/in/README")));

        // Unknown formats are rejected before the file is opened
        let extractor = DocumentExtractor::new();
        assert_eq!(extractor.read_file_data(Path::new("/nonexistent/draft.hwp")), None);
        assert_eq!(extractor.extract_text(Path::new("/nonexistent/draft.hwp")), "");
    }

    #[test]
    fn test_corrupt_document_fails_safe() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("broken.docx");
        std::fs::write(&broken, "not a zip").unwrap();

        let extractor = DocumentExtractor::new();
        assert_eq!(extractor.read_file_data(&broken), None);
        assert_eq!(extractor.extract_text(&broken), "");
    }

    #[test]
    fn test_text_preview_is_capped_but_full_text_is_not() {
        let dir = TempDir::new().unwrap();
        let notes = dir.path().join("notes.TXT");
        std::fs::write(&notes, "가".repeat(5000)).unwrap();

        let extractor = DocumentExtractor::new();
        let preview = extractor.read_file_data(&notes).unwrap();
        assert_eq!(preview.chars().count(), CLASSIFY_TEXT_CHARS);
        assert_eq!(extractor.extract_text(&notes).chars().count(), 5000);
    }
}
