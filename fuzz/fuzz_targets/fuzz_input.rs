// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use libfuzzer_sys::fuzz_target;
use topicfold::category::extract_category;
use topicfold::classifier::parse_bulk_answer;
use topicfold::normalize::{normalize, sanitize_filename};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Labels become directory names
    if let Some(label) = extract_category(Some(text)) {
        assert!(!label.is_empty());
        assert!(!label.contains('/') && !label.contains('\\'));
    }

    for label in parse_bulk_answer(text).values() {
        assert!(!label.contains('/'));
    }

    let key = normalize(text);
    assert!(!key.contains('_') && !key.contains("  "));

    let name = sanitize_filename(text, 50, 5);
    assert!(!name.is_empty());
    assert!(!name.contains('/'));
});
