// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Merging near-duplicate folder labels within one run

use std::collections::BTreeSet;
use tracing::debug;

use crate::normalize::label_key;
use crate::similarity::sequence_ratio;

#[derive(Debug, Clone)]
struct Entry {
    canonical: String,
    key: String,
    aliases: BTreeSet<String>,
}

/// Canonical labels in insertion order, each with the variants folded into it
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    entries: Vec<Entry>,
    cutoff: f64,
}

impl CategoryRegistry {
    pub fn new(cutoff: f64) -> Self {
        Self { entries: Vec::new(), cutoff }
    }

    /// Map `label` onto an existing canonical label, or register it as a new one.
    ///
    /// Labels are compared with whitespace and underscores removed; the first
    /// registered label whose ratio reaches the cutoff wins.
    pub fn reconcile(&mut self, label: &str) -> String {
        let key = label_key(label);

        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.key == key || sequence_ratio(&key, &e.key) >= self.cutoff)
        {
            if entry.canonical != label {
                debug!("Merging folder label '{}' into '{}'", label, entry.canonical);
                entry.aliases.insert(label.to_string());
            }
            return entry.canonical.clone();
        }

        self.entries.push(Entry {
            canonical: label.to_string(),
            key,
            aliases: BTreeSet::new(),
        });
        label.to_string()
    }

    /// Canonical labels in registration order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.canonical.as_str())
    }

    /// Variants merged into `canonical`
    pub fn aliases(&self, canonical: &str) -> Option<&BTreeSet<String>> {
        self.entries
            .iter()
            .find(|e| e.canonical == canonical)
            .map(|e| &e.aliases)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
