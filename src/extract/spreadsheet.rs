// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Workbook cells as text

use calamine::{open_workbook_auto, Reader};
use std::path::Path;
use tracing::debug;

use crate::{Result, TopicfoldError};

/// Every non-empty row of every sheet, cells separated by tabs
pub fn extract_workbook(path: &Path) -> Result<String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| TopicfoldError::Extraction(format!("Failed to open spreadsheet: {}", e)))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut text = String::new();

    for sheet_name in &sheet_names {
        let range = match workbook.worksheet_range(sheet_name) {
            Ok(range) => range,
            Err(e) => {
                debug!("Skipping sheet '{}' in {:?}: {}", sheet_name, path, e);
                continue;
            }
        };

        for row in range.rows() {
            let cells: Vec<String> = row
                .iter()
                .map(|c| c.to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if !cells.is_empty() {
                text.push_str(&cells.join("\t"));
                text.push('\n');
            }
        }
    }

    Ok(text.trim_end().to_string())
}
