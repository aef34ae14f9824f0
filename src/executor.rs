// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Applying planned operations to the filesystem

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use crate::history::{History, HistoryEntry};
use crate::planner::{LinkType, Operation};
use crate::sink::Sink;

/// Outcome of one execution pass
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub succeeded: Vec<Operation>,
    /// Failed operations with the error text
    pub failed: Vec<(Operation, String)>,
}

impl ExecutionReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Rename `src` to `dst`, falling back to copy and delete across volumes
pub fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !src.is_file() {
                return Err(rename_err);
            }
            debug!("rename failed ({}), copying {:?} instead", rename_err, src);
            fs::copy(src, dst)?;
            if let Err(e) = fs::remove_file(src) {
                // Leave a single copy behind rather than two.
                let _ = fs::remove_file(dst);
                return Err(e);
            }
            Ok(())
        }
    }
}

fn apply(op: &Operation) -> io::Result<()> {
    if let Some(parent) = op.destination.parent() {
        fs::create_dir_all(parent)?;
    }
    match op.link_type {
        LinkType::Move => move_file(&op.source, &op.destination),
        LinkType::Hardlink => fs::hard_link(&op.source, &op.destination),
    }
}

/// Run every operation in order.
///
/// A failure is reported through `sink` and recorded; the remaining operations still
/// run. In dry-run mode nothing on disk changes, including directories. Successful
/// real operations are journaled when `history` is given.
pub fn execute_operations(
    operations: &[Operation],
    dry_run: bool,
    sink: &dyn Sink,
    history: Option<&History>,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    let verb = |link_type: LinkType| match link_type {
        LinkType::Move => "Moved",
        LinkType::Hardlink => "Linked",
    };

    for op in operations {
        let src = op.source.display();
        let dst = op.destination.display();

        let outcome = if dry_run { Ok(()) } else { apply(op) };

        match outcome {
            Ok(()) => {
                sink.emit(&format!("{} file from '{}' to '{}'", verb(op.link_type), src, dst));
                if let (false, Some(history)) = (dry_run, history) {
                    if let Err(e) = history.record(&HistoryEntry::filed(op)) {
                        warn!("Failed to record move in history: {}", e);
                    }
                }
                report.succeeded.push(op.clone());
            }
            Err(e) => {
                sink.emit(&format!("Error moving file from '{}' to '{}': {}", src, dst, e));
                report.failed.push((op.clone(), e.to_string()));
            }
        }
    }

    debug!(
        "Executed {} operations: {} ok, {} failed",
        report.total(),
        report.succeeded.len(),
        report.failed.len()
    );
    report
}
