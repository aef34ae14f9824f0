// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! String similarity scores and seed-based filename grouping

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::normalize;

/// How two filenames are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Jaccard index over normalized token sets
    TokenSet,
    /// Matching-blocks ratio over the raw filenames
    CharSequence,
}

/// Jaccard similarity of the normalized token sets of two names.
///
/// Two names without any tokens score 0.0.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let left: HashSet<String> = normalize::tokens(a).into_iter().collect();
    let right: HashSet<String> = normalize::tokens(b).into_iter().collect();

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    intersection as f64 / union as f64
}

/// Matching-blocks similarity ratio in `[0, 1]`, with the popular-element heuristic
/// enabled. Two empty strings score 1.0.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    SequenceMatcher::new(a, b).ratio()
}

/// Longest-matching-blocks comparison of two character sequences.
///
/// Blocks are found by taking the longest common run, then recursing into the
/// unmatched regions on either side of it.
pub struct SequenceMatcher {
    a: Vec<char>,
    b: Vec<char>,
    b2j: HashMap<char, Vec<usize>>,
}

impl SequenceMatcher {
    pub fn new(a: &str, b: &str) -> Self {
        Self::with_autojunk(a, b, true)
    }

    /// With `autojunk`, characters that make up more than 1% of a second sequence of
    /// at least 200 characters are not used as match anchors.
    pub fn with_autojunk(a: &str, b: &str, autojunk: bool) -> Self {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();

        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }

        let n = b.len();
        if autojunk && n >= 200 {
            let ntest = n / 100 + 1;
            b2j.retain(|_, idxs| idxs.len() <= ntest);
        }

        Self { a, b, b2j }
    }

    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut new_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(indices) = self.b2j.get(&self.a[i]) {
                for &j in indices {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = if j > 0 { j2len.get(&(j - 1)).copied().unwrap_or(0) } else { 0 } + 1;
                    new_j2len.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = new_j2len;
        }

        // Popular characters are skipped as anchors but may still extend a match.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        (besti, bestj, bestsize)
    }

    /// `(i, j, size)` blocks where `a[i..i+size] == b[j..j+size]`, in no particular order
    pub fn matching_blocks(&self) -> Vec<(usize, usize, usize)> {
        let mut blocks = Vec::new();
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            blocks.push((i, j, k));
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        blocks
    }

    pub fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matches: usize = self.matching_blocks().iter().map(|(_, _, k)| k).sum();
        2.0 * matches as f64 / total as f64
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Score two filenames with the given strategy
pub fn score(strategy: Strategy, a: &str, b: &str) -> f64 {
    match strategy {
        Strategy::TokenSet => jaccard(a, b),
        Strategy::CharSequence => sequence_ratio(a, b),
    }
}

/// Partition `files` into groups of similar names.
///
/// Single pass in input order: each still-unassigned file seeds a group and absorbs
/// every later unassigned file whose score against the seed reaches `threshold`.
/// Membership is decided against the seed only, so results depend on input order.
/// Returns index groups covering every input exactly once.
pub fn group_by_similarity<P: AsRef<Path>>(files: &[P], strategy: Strategy, threshold: f64) -> Vec<Vec<usize>> {
    let names: Vec<String> = files.iter().map(|p| file_name(p.as_ref())).collect();
    let mut assigned = vec![false; names.len()];
    let mut groups = Vec::new();

    for seed in 0..names.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut group = vec![seed];

        for other in (seed + 1)..names.len() {
            if assigned[other] {
                continue;
            }
            if score(strategy, &names[seed], &names[other]) >= threshold {
                assigned[other] = true;
                group.push(other);
            }
        }

        groups.push(group);
    }

    groups
}
