// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Turning free-text model answers into folder labels
//!
//! [`validate_label`] is the only gate between a model answer and a directory name.
//! Every extraction path, including group and bulk answers, must pass through it.

use once_cell::sync::Lazy;
use regex::Regex;

/// Label for an empty or missing answer
pub const UNCLASSIFIED: &str = "미분류";

/// Answers that mean "no idea" and must never become folders
const DENY_LIST: &[&str] = &["기타", "unknown", "모름", "알수없음", "미정", "없음", "none", "n/a"];

/// Characters never allowed inside a label
const FORBIDDEN: &[char] = &[
    '"', '\'', '`', '“', '”', '‘', '’', '「', '」', '『', '』',
    '/', '\\', '*', '<', '>', '|', '?', ':', '：',
];

/// Candidate lines longer than this are treated as chatter
const MAX_CANDIDATE_CHARS: usize = 20;

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(카테고리|폴더명|폴더 이름|주제|category|folder)\s*[:：]\s*").expect("static regex")
});
static PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(추천\s*)?(카테고리|폴더명|주제|분류|답변|정답|answer|category)\s*([:：]|은|는)\s*")
        .expect("static regex")
});
static LIST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.)]\s*").expect("static regex"));

/// Extract a label from a raw model answer.
///
/// An empty or absent answer yields [`UNCLASSIFIED`]. Otherwise the text after the
/// first category marker wins; without a marker the first short non-empty line is
/// used. The result is cleaned and then validated, so degenerate answers give `None`.
pub fn extract_category(response: Option<&str>) -> Option<String> {
    let text = match response.map(str::trim) {
        None | Some("") => return Some(UNCLASSIFIED.to_string()),
        Some(t) => t,
    };

    let raw = marker_value(text).unwrap_or_else(|| candidate_line(text));
    validate_label(&clean_label(raw))
}

/// Text following the last marker on the first line that has a non-empty one
fn marker_value(text: &str) -> Option<&str> {
    text.lines().find_map(|line| {
        let last = MARKER.find_iter(line).last()?;
        let value = line[last.end()..].trim();
        (!value.is_empty()).then_some(value)
    })
}

fn candidate_line(text: &str) -> &str {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.clone().next().unwrap_or("");
    lines
        .find(|l| (2..=MAX_CANDIDATE_CHARS).contains(&l.chars().count()))
        .unwrap_or(first)
}

/// Strip markup, echoed instruction words, quotes and separators from a label
pub fn clean_label(raw: &str) -> String {
    let mut label = raw.trim_start_matches(|c: char| !c.is_alphanumeric()).to_string();
    label = LIST_NUMBER.replace(&label, "").into_owned();
    label = label.trim_start_matches(|c: char| !c.is_alphanumeric()).to_string();

    loop {
        let stripped = PREAMBLE.replace(&label, "").into_owned();
        if stripped == label {
            break;
        }
        label = stripped;
    }

    label.retain(|c| !FORBIDDEN.contains(&c));

    let mut label = label
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | '!' | ';' | ']' | ')' | '。') || c.is_whitespace())
        .to_string();
    for suffix in ["입니다", "이에요", "예요"] {
        if let Some(stem) = label.strip_suffix(suffix) {
            label = stem.trim_end().to_string();
        }
    }

    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_hangul(c: char) -> bool {
    matches!(c, '\u{AC00}'..='\u{D7A3}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}')
}

/// Accept a cleaned label only if it is Korean, at least two characters long and not
/// a degenerate answer
pub fn validate_label(label: &str) -> Option<String> {
    let label = label.trim();
    if label.chars().count() < 2 || !label.chars().any(is_hangul) {
        return None;
    }

    let key: String = label.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase();
    if DENY_LIST.contains(&key.as_str()) {
        return None;
    }

    Some(label.to_string())
}
