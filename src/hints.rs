// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Append-only classification log, replayed as few-shot examples
//!
//! Two line shapes are written and recognised:
//!
//! ```text
//! [분류] week3_notes.md → 자료구조
//! [자료구조] → week3_notes.md, week4_notes.md
//! ```
//!
//! Anything else in the file (silent-mode messages share it) is ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::category::validate_label;
use crate::Result;

/// Marker on single-file lines
pub const LABEL_MARKER: &str = "분류";

static SINGLE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[분류\]\s+(.+?)\s+(?:→|->)\s+(.+?)\s*$").expect("static regex"));

/// `[label] → a, b, c`; also used for bulk model answers
pub static GROUP_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[([^\]]+)\]\s*(?:→|->)\s*(.+?)\s*$").expect("static regex"));

/// One label with the filenames seen under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintExample {
    pub label: String,
    pub files: Vec<String>,
}

/// Handle on the example log file
pub struct HintLog {
    path: PathBuf,
}

impl HintLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_line(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Record one file's label
    pub fn append_single(&self, file_name: &str, label: &str) -> Result<()> {
        self.append_line(&format!("[{}] {} → {}", LABEL_MARKER, file_name, label))
    }

    /// Record a label shared by several files
    pub fn append_group(&self, label: &str, file_names: &[String]) -> Result<()> {
        if file_names.is_empty() {
            return Ok(());
        }
        self.append_line(&format!("[{}] → {}", label, file_names.join(", ")))
    }

    /// Distinct label → filenames pairs in first-seen order, at most `max_examples`
    /// filenames in total. A missing file yields no examples.
    pub fn load_examples(&self, max_examples: usize) -> Result<Vec<HintExample>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(parse_examples(&content, max_examples))
    }
}

/// Parse log text into examples, skipping lines of any other shape
pub fn parse_examples(content: &str, max_examples: usize) -> Vec<HintExample> {
    let mut examples: Vec<HintExample> = Vec::new();
    let mut total = 0;

    for line in content.lines() {
        if total >= max_examples {
            break;
        }

        let (label, files): (&str, Vec<&str>) = if let Some(caps) = SINGLE_LINE.captures(line) {
            match (caps.get(1), caps.get(2)) {
                (Some(file), Some(label)) => (label.as_str(), vec![file.as_str()]),
                _ => continue,
            }
        } else if let Some(caps) = GROUP_LINE.captures(line) {
            match (caps.get(1), caps.get(2)) {
                (Some(label), Some(list)) if label.as_str() != LABEL_MARKER => {
                    (label.as_str(), list.as_str().split(',').map(str::trim).collect())
                }
                _ => continue,
            }
        } else {
            continue;
        };

        let Some(label) = validate_label(label) else {
            continue;
        };

        let index = match examples.iter().position(|e| e.label == label) {
            Some(i) => i,
            None => {
                examples.push(HintExample { label, files: Vec::new() });
                examples.len() - 1
            }
        };

        for file in files.into_iter().filter(|f| !f.is_empty()) {
            if total >= max_examples {
                break;
            }
            let entry = &mut examples[index];
            if !entry.files.iter().any(|f| f == file) {
                entry.files.push(file.to_string());
                total += 1;
            }
        }
    }

    examples.retain(|e| !e.files.is_empty());
    examples
}

/// Examples in the group-line shape, one per line, for prompt injection
pub fn render_examples(examples: &[HintExample]) -> String {
    examples
        .iter()
        .map(|e| format!("[{}] → {}", e.label, e.files.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}
