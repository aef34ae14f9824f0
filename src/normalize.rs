// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Filename normalization for similarity comparison
//!
//! The output of [`normalize`] is a comparison key only. It never becomes a folder or
//! file name on disk; see [`sanitize_filename`] for that.

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder returned when sanitizing leaves nothing usable
pub const UNNAMED: &str = "분류안됨";

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s가-힣]").expect("static regex"));
static WORD_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s_]+").expect("static regex"));

/// Final path component of a `/` or `\` separated string
fn base_name(raw: &str) -> &str {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw)
}

/// Drop the last `.ext`, keeping dotfiles intact
fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

fn is_boundary(prev: char, next: char) -> bool {
    (prev.is_alphabetic() && next.is_ascii_digit()) || (prev.is_ascii_digit() && next.is_alphabetic())
}

/// Normalize a raw filename into lower-cased, space-separated tokens.
///
/// `"Report_v2-final.docx"` becomes `"report v 2 final"`.
pub fn normalize(raw: &str) -> String {
    let stem = strip_extension(base_name(raw));

    let mut spaced = String::with_capacity(stem.len() + 8);
    let mut prev: Option<char> = None;
    for c in stem.chars() {
        let c = if matches!(c, '_' | '-' | '.') { ' ' } else { c };
        if let Some(p) = prev {
            if is_boundary(p, c) {
                spaced.push(' ');
            }
        }
        spaced.push(c);
        prev = Some(c);
    }

    spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whitespace-separated token list of a normalized name
pub fn tokens(raw: &str) -> Vec<String> {
    normalize(raw).split(' ').filter(|t| !t.is_empty()).map(String::from).collect()
}

/// Comparison key for folder labels: whitespace and underscores removed
pub fn label_key(label: &str) -> String {
    label.chars().filter(|c| !c.is_whitespace() && *c != '_').collect()
}

/// Clean a model-suggested name into a safe file stem.
///
/// Drops the extension and punctuation, joins at most `max_words` words with `_`,
/// lower-cases and truncates to `max_length` characters.
pub fn sanitize_filename(name: &str, max_length: usize, max_words: usize) -> String {
    let name = strip_extension(name.trim());
    let cleaned = NON_WORD.replace_all(name, "");
    let joined = WORD_SEPARATORS.replace_all(cleaned.trim(), "_").to_lowercase();

    let limited = joined
        .split('_')
        .filter(|w| !w.is_empty())
        .take(max_words)
        .collect::<Vec<_>>()
        .join("_");

    if limited.is_empty() {
        UNNAMED.to_string()
    } else {
        limited.chars().take(max_length).collect()
    }
}
