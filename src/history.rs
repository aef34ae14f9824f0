// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Journal of filed and quarantined files
//!
//! One JSON object per line, appended after each successful relocation. Undo walks
//! the journal backwards and puts files back where the scan found them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::executor::move_file;
use crate::planner::{LinkType, Operation};
use crate::sink::Sink;
use crate::Result;

/// Which pass relocated the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Placed under a topic, date or type folder by `organize`
    Filed,
    /// Set aside as a duplicate or stale version by `isolate`
    Quarantined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub kind: EntryKind,
    /// Where the scan found the file
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Topic path such as `2024/3분기/알고리즘`, or the quarantine folder name
    pub folder: String,
    #[serde(default)]
    pub link_type: LinkType,
    #[serde(default)]
    pub undone: bool,
}

impl HistoryEntry {
    /// Entry for an executed organize operation
    pub fn filed(op: &Operation) -> Self {
        Self::new(EntryKind::Filed, op.source.clone(), op.destination.clone(), op.category.clone(), op.link_type)
    }

    /// Entry for a file moved under the quarantine root
    pub fn quarantined(source: PathBuf, destination: PathBuf, folder: impl Into<String>) -> Self {
        Self::new(EntryKind::Quarantined, source, destination, folder.into(), LinkType::Move)
    }

    fn new(kind: EntryKind, source: PathBuf, destination: PathBuf, folder: String, link_type: LinkType) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            kind,
            source,
            destination,
            folder,
            link_type,
            undone: false,
        }
    }
}

/// Outcome of an undo pass
#[derive(Debug, Default)]
pub struct UndoReport {
    pub undone: Vec<HistoryEntry>,
    pub skipped: Vec<HistoryEntry>,
}

/// The JSONL journal file
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry; the file is created on first use
    pub fn record(&self, entry: &HistoryEntry) -> Result<()> {
        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Every entry in journal order; unparsable lines are skipped
    pub fn entries(&self) -> Result<Vec<HistoryEntry>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Ignoring malformed journal line in {:?}: {}", self.path, e);
                    None
                }
            })
            .collect())
    }

    /// Newest `count` entries, newest first
    pub fn recent(&self, count: usize) -> Result<Vec<HistoryEntry>> {
        Ok(self.entries()?.into_iter().rev().take(count).collect())
    }

    /// Entries not yet undone, in journal order
    pub fn pending(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.entries()?.into_iter().filter(|e| !e.undone).collect())
    }

    /// Flag the given entries as undone with a single rewrite of the journal
    pub fn mark_undone(&self, ids: &HashSet<Uuid>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut rewritten = String::new();
        for mut entry in self.entries()? {
            entry.undone |= ids.contains(&entry.id);
            rewritten.push_str(&serde_json::to_string(&entry)?);
            rewritten.push('\n');
        }
        fs::write(&self.path, rewritten)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Put back the `count` newest pending files, newest first.
    ///
    /// An entry is skipped when its destination is gone or, for moves, when
    /// something already sits at the original location. Skipped entries stay
    /// pending.
    pub fn undo_recent(&self, count: usize, dry_run: bool, sink: &dyn Sink) -> Result<UndoReport> {
        let mut report = UndoReport::default();
        let mut restored_ids = HashSet::new();

        for entry in self.pending()?.into_iter().rev().take(count) {
            if !entry.destination.exists() {
                warn!("{:?} is no longer at {:?}", entry.source, entry.destination);
                report.skipped.push(entry);
                continue;
            }
            if entry.link_type == LinkType::Move && entry.source.exists() {
                warn!("Original location is occupied: {:?}", entry.source);
                report.skipped.push(entry);
                continue;
            }

            if dry_run {
                sink.emit(&format!(
                    "Would undo: '{}' -> '{}'",
                    entry.destination.display(),
                    entry.source.display()
                ));
                report.undone.push(entry);
                continue;
            }

            let outcome = match entry.link_type {
                LinkType::Move => entry
                    .source
                    .parent()
                    .map_or(Ok(()), fs::create_dir_all)
                    .and_then(|_| move_file(&entry.destination, &entry.source)),
                LinkType::Hardlink => fs::remove_file(&entry.destination),
            };

            match outcome {
                Ok(()) => {
                    sink.emit(&format!(
                        "Undone: '{}' -> '{}'",
                        entry.destination.display(),
                        entry.source.display()
                    ));
                    restored_ids.insert(entry.id);
                    report.undone.push(entry);
                }
                Err(e) => {
                    sink.emit(&format!("Error undoing '{}': {}", entry.destination.display(), e));
                    report.skipped.push(entry);
                }
            }
        }

        self.mark_undone(&restored_ids)?;
        debug!("Undo pass: {} restored, {} skipped", report.undone.len(), report.skipped.len());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use tempfile::TempDir;

    fn filed(source: PathBuf, destination: PathBuf, folder: &str) -> HistoryEntry {
        HistoryEntry::filed(&Operation {
            source,
            destination,
            link_type: LinkType::Move,
            category: folder.to_string(),
        })
    }

    #[test]
    fn test_record_recent_and_clear() {
        let dir = TempDir::new().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));
        assert!(history.entries().unwrap().is_empty());

        for name in ["a", "b", "c"] {
            history
                .record(&filed(
                    PathBuf::from(format!("/in/{}.txt", name)),
                    PathBuf::from(format!("/out/문서/{}.txt", name)),
                    "문서",
                ))
                .unwrap();
        }

        let recent = history.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].source, PathBuf::from("/in/c.txt"));
        assert_eq!(recent[0].kind, EntryKind::Filed);

        history.mark_undone(&HashSet::from([recent[0].id])).unwrap();
        assert_eq!(history.pending().unwrap().len(), 2);

        history.clear().unwrap();
        assert!(!history.path().exists());
        history.clear().unwrap();
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.jsonl");
        let entry = HistoryEntry::quarantined(PathBuf::from("/in/a.txt"), PathBuf::from("/q/중복파일/a.txt"), "중복파일");
        std::fs::write(&path, format!("not json\n\n{}\n", serde_json::to_string(&entry).unwrap())).unwrap();

        let entries = History::new(path).entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Quarantined);
        assert_eq!(entries[0].folder, "중복파일");
    }

    #[test]
    fn test_undo_restores_newest_first() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out/알고리즘");
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(output.join("sort.pdf"), "s").unwrap();
        std::fs::write(output.join("graph.pdf"), "g").unwrap();

        let history = History::new(dir.path().join("history.jsonl"));
        for name in ["sort.pdf", "graph.pdf"] {
            history.record(&filed(input.join(name), output.join(name), "알고리즘")).unwrap();
        }

        let sink = MemorySink::default();
        let report = history.undo_recent(1, false, &sink).unwrap();
        assert_eq!(report.undone.len(), 1);
        assert!(input.join("graph.pdf").exists());
        assert!(!output.join("graph.pdf").exists());
        assert!(output.join("sort.pdf").exists());
        assert_eq!(history.pending().unwrap().len(), 1);
        assert_eq!(sink.messages().len(), 1);
    }

    #[test]
    fn test_undo_dry_run_keeps_entries_pending() {
        let dir = TempDir::new().unwrap();
        let quarantine = dir.path().join("삭제후보/구버전");
        std::fs::create_dir_all(&quarantine).unwrap();
        std::fs::write(quarantine.join("plan_v1.txt"), "v1").unwrap();

        let history = History::new(dir.path().join("history.jsonl"));
        history
            .record(&HistoryEntry::quarantined(
                dir.path().join("in/plan_v1.txt"),
                quarantine.join("plan_v1.txt"),
                "구버전",
            ))
            .unwrap();

        let sink = MemorySink::default();
        let report = history.undo_recent(1, true, &sink).unwrap();
        assert_eq!(report.undone.len(), 1);
        assert!(quarantine.join("plan_v1.txt").exists());
        assert_eq!(history.pending().unwrap().len(), 1);
        assert!(sink.messages()[0].starts_with("Would undo: "));
    }

    #[test]
    fn test_undo_skips_missing_destination() {
        let dir = TempDir::new().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));
        history
            .record(&filed(dir.path().join("in/gone.txt"), dir.path().join("out/gone.txt"), "문서"))
            .unwrap();

        let report = history.undo_recent(5, false, &MemorySink::default()).unwrap();
        assert!(report.undone.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(history.pending().unwrap().len(), 1);
    }
}
