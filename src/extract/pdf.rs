// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! PDF text

use std::path::Path;
use tracing::warn;

use crate::{Result, TopicfoldError};

/// Text of the first `max_pages` pages
pub fn extract_pages(path: &Path, max_pages: usize) -> Result<String> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| TopicfoldError::Pdf(format!("Failed to load PDF: {}", e)))?;

    let pages: Vec<u32> = doc.get_pages().keys().copied().take(max_pages).collect();
    if pages.is_empty() {
        return Ok(String::new());
    }

    doc.extract_text(&pages)
        .map_err(|e| TopicfoldError::Pdf(format!("Text extraction failed: {}", e)))
}

/// Text of every page.
///
/// Some fonts make the extractor panic; that is reported as an error.
pub fn extract_all(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;

    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(TopicfoldError::Pdf(format!("Text extraction failed: {}", e))),
        Err(_) => {
            warn!("PDF extraction panicked for {:?}", path);
            Err(TopicfoldError::Pdf("extractor panicked".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_garbage_is_pdf_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, "plain text pretending").unwrap();

        assert!(matches!(extract_pages(&path, 3), Err(TopicfoldError::Pdf(_))));
        assert!(extract_all(&path).is_err());
    }
}
