// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Quarantining exact duplicates and superseded versions
//!
//! Runs in two phases over one directory tree:
//!
//! 1. files with identical content are grouped by hash; the most recently modified
//!    copy stays and the rest go to the duplicate folder;
//! 2. the remaining files are grouped by a version-stripped name, linked when their
//!    extracted text is nearly identical, and every connected component keeps only
//!    its most recently modified member.
//!
//! Nothing is deleted. Files are moved under the quarantine root, which is itself
//! never scanned.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::IsolateConfig;
use crate::executor::move_file;
use crate::extract::TextExtractor;
use crate::history::{History, HistoryEntry};
use crate::planner::with_suffix;
use crate::scan::{absolute_path, collect_file_paths, file_name, FileRecord};
use crate::similarity::sequence_ratio;
use crate::sink::Sink;
use crate::Result;

static VERSION_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(ver|v)?[._\-]?[0-9]+(\.[0-9]+)?").expect("static regex"));

const VERSION_KEYWORDS: &[&str] = &["rev", "판본", "draft", "수정본", "최종", "복사본"];

/// Why a file was quarantined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarantineReason {
    Duplicate,
    StaleVersion,
}

impl QuarantineReason {
    fn describe(self) -> &'static str {
        match self {
            Self::Duplicate => "전체 검사 기반 중복파일 정리",
            Self::StaleVersion => "내용 유사 기반 구버전 정리",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuarantinedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// The cluster member left in place
    pub keeper: PathBuf,
    pub reason: QuarantineReason,
}

#[derive(Debug, Default)]
pub struct IsolationReport {
    pub scanned: usize,
    pub quarantined: Vec<QuarantinedFile>,
    pub failed: Vec<(PathBuf, String)>,
}

impl IsolationReport {
    pub fn count(&self, reason: QuarantineReason) -> usize {
        self.quarantined.iter().filter(|q| q.reason == reason).count()
    }
}

/// Comparison key with version markers removed
pub fn simplify_filename(name: &str) -> String {
    let lower = name.to_lowercase();
    let stem = Path::new(&lower)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut key = VERSION_TOKEN.replace_all(&stem, "").into_owned();
    for keyword in VERSION_KEYWORDS {
        key = key.replace(keyword, "");
    }
    key.trim().replace(['_', ' '], "")
}

/// Character-sequence ratio of two texts; an empty side never counts as similar
pub fn content_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    sequence_ratio(a, b)
}

/// Index of the most recently modified record; earlier records win ties
fn latest(records: &[FileRecord], members: &[usize]) -> Option<usize> {
    members.iter().copied().fold(None, |best, i| match best {
        Some(b) if records[b].modified >= records[i].modified => Some(b),
        _ => Some(i),
    })
}

/// Breadth-first connected components, in order of each component's first member
pub fn connected_components(count: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); count];
    for &(a, b) in edges {
        adjacency[a].push(b);
        adjacency[b].push(a);
    }

    let mut visited = vec![false; count];
    let mut components = Vec::new();
    for start in 0..count {
        if visited[start] {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::from([start]);
        visited[start] = true;
        while let Some(current) = queue.pop_front() {
            component.push(current);
            for &next in &adjacency[current] {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components
}

/// Duplicate and stale-version isolation over one directory
pub struct Isolator<'a> {
    config: &'a IsolateConfig,
    extractor: &'a dyn TextExtractor,
    sink: &'a dyn Sink,
    history: Option<&'a History>,
}

impl<'a> Isolator<'a> {
    pub fn new(config: &'a IsolateConfig, extractor: &'a dyn TextExtractor, sink: &'a dyn Sink) -> Self {
        Self {
            config,
            extractor,
            sink,
            history: None,
        }
    }

    /// Journal quarantine moves so they can be undone
    pub fn with_history(mut self, history: &'a History) -> Self {
        self.history = Some(history);
        self
    }

    /// Scan `directory` and quarantine duplicates and stale versions
    pub fn isolate_all(&self, directory: &Path, dry_run: bool) -> Result<IsolationReport> {
        let directory = absolute_path(directory)?;
        let root = absolute_path(&self.config.quarantine_root(&directory))?;
        info!("Isolating duplicates under {:?} into {:?}", directory, root);

        let records: Vec<FileRecord> = collect_file_paths(&directory, &[root.clone()])?
            .into_iter()
            .filter_map(|path| match FileRecord::from_path(&path) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping {:?}: {}", path, e);
                    None
                }
            })
            .collect();

        let mut report = IsolationReport {
            scanned: records.len(),
            ..Default::default()
        };
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        // Phase 1: identical bytes
        let mut by_hash: Vec<Vec<usize>> = Vec::new();
        let mut hash_index: HashMap<String, usize> = HashMap::new();
        for (i, record) in records.iter().enumerate() {
            match record.content_hash() {
                Ok(hash) => {
                    let slot = *hash_index.entry(hash.to_string()).or_insert_with(|| {
                        by_hash.push(Vec::new());
                        by_hash.len() - 1
                    });
                    by_hash[slot].push(i);
                }
                Err(e) => warn!("Could not hash {:?}: {}", record.path, e),
            }
        }

        let mut in_duplicate_group = vec![false; records.len()];
        for group in by_hash.iter().filter(|g| g.len() > 1) {
            let Some(keeper) = latest(&records, group) else { continue };
            for &i in group {
                in_duplicate_group[i] = true;
                if i != keeper {
                    self.quarantine(&records[i], &records[keeper], QuarantineReason::Duplicate, &root, dry_run, &mut claimed, &mut report);
                }
            }
        }

        // Phase 2: same simplified name and near-identical text
        let mut by_key: Vec<(String, Vec<usize>)> = Vec::new();
        for (i, record) in records.iter().enumerate() {
            if in_duplicate_group[i] {
                continue;
            }
            let key = simplify_filename(&record.file_name());
            match by_key.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(i),
                None => by_key.push((key, vec![i])),
            }
        }

        for (key, members) in by_key.iter().filter(|(_, m)| m.len() > 1) {
            let texts: Vec<String> = members
                .iter()
                .map(|&i| self.extractor.extract_text(&records[i].path))
                .collect();

            let mut edges = Vec::new();
            for a in 0..members.len() {
                for b in (a + 1)..members.len() {
                    let score = content_similarity(&texts[a], &texts[b]);
                    if score >= self.config.similarity_threshold {
                        edges.push((a, b));
                    }
                }
            }
            debug!("Version group '{}': {} files, {} similar pairs", key, members.len(), edges.len());

            for component in connected_components(members.len(), &edges) {
                if component.len() < 2 {
                    continue;
                }
                let indices: Vec<usize> = component.iter().map(|&c| members[c]).collect();
                let Some(keeper) = latest(&records, &indices) else { continue };
                for &i in indices.iter().filter(|&&i| i != keeper) {
                    self.quarantine(&records[i], &records[keeper], QuarantineReason::StaleVersion, &root, dry_run, &mut claimed, &mut report);
                }
            }
        }

        info!(
            "Isolation finished: {} scanned, {} duplicates, {} stale, {} failed",
            report.scanned,
            report.count(QuarantineReason::Duplicate),
            report.count(QuarantineReason::StaleVersion),
            report.failed.len()
        );
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn quarantine(
        &self,
        record: &FileRecord,
        keeper: &FileRecord,
        reason: QuarantineReason,
        root: &Path,
        dry_run: bool,
        claimed: &mut HashSet<PathBuf>,
        report: &mut IsolationReport,
    ) {
        let folder = match reason {
            QuarantineReason::Duplicate => &self.config.duplicate_folder,
            QuarantineReason::StaleVersion => &self.config.stale_folder,
        };
        let dir = root.join(folder);
        let name = file_name(&record.path);

        let mut destination = dir.join(&name);
        let mut counter = 1;
        while claimed.contains(&destination) || destination.exists() {
            destination = dir.join(with_suffix(&name, counter));
            counter += 1;
        }

        let moved = if dry_run {
            Ok(())
        } else {
            std::fs::create_dir_all(&dir).and_then(|_| move_file(&record.path, &destination))
        };

        match moved {
            Ok(()) => {
                claimed.insert(destination.clone());
                let prefix = if dry_run { "[dry-run] " } else { "" };
                self.sink.emit(&format!(
                    "{}{} → {} 이유: {}",
                    prefix,
                    name,
                    dir.display(),
                    reason.describe()
                ));
                if let (false, Some(history)) = (dry_run, self.history) {
                    let entry = HistoryEntry::quarantined(record.path.clone(), destination.clone(), folder.as_str());
                    if let Err(e) = history.record(&entry) {
                        warn!("Failed to record quarantine move: {}", e);
                    }
                }
                report.quarantined.push(QuarantinedFile {
                    source: record.path.clone(),
                    destination,
                    keeper: keeper.path.clone(),
                    reason,
                });
            }
            Err(e) => {
                self.sink.emit(&format!(
                    "Error moving file from '{}' to '{}': {}",
                    record.path.display(),
                    destination.display(),
                    e
                ));
                report.failed.push((record.path.clone(), e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    /// Reads files as UTF-8, empty on failure
    struct PlainText;

    impl TextExtractor for PlainText {
        fn read_file_data(&self, path: &Path) -> Option<String> {
            std::fs::read_to_string(path).ok()
        }

        fn extract_text(&self, path: &Path) -> String {
            std::fs::read_to_string(path).unwrap_or_default()
        }
    }

    fn write_at(path: &Path, content: &str, unix_time: i64) {
        std::fs::write(path, content).unwrap();
        set_file_mtime(path, FileTime::from_unix_time(unix_time, 0)).unwrap();
    }

    fn config_for(root: &Path) -> IsolateConfig {
        IsolateConfig {
            quarantine_dir: Some(root.to_string_lossy().into_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn test_simplify_filename() {
        assert_eq!(simplify_filename("report_v1.docx"), "report");
        assert_eq!(simplify_filename("report_v2.docx"), "report");
        assert_eq!(simplify_filename("Report ver.3.1.docx"), "report");
        assert_eq!(simplify_filename("보고서_최종_수정본.hwp"), "보고서");
        assert_eq!(simplify_filename("data2024.csv"), "data");
        assert_eq!(simplify_filename("notes.txt"), "notes");
    }

    #[test]
    fn test_components_include_singletons() {
        let components = connected_components(5, &[(0, 3), (3, 4)]);
        assert_eq!(components, vec![vec![0, 3, 4], vec![1], vec![2]]);
    }

    #[test]
    fn test_empty_text_never_similar() {
        assert_eq!(content_similarity("", ""), 0.0);
        assert_eq!(content_similarity("abc", ""), 0.0);
        assert_eq!(content_similarity("abc", "abc"), 1.0);
    }

    #[test]
    fn test_exact_duplicate_keeps_newest() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().canonicalize().unwrap();
        let input = base.join("in");
        let quarantine = base.join("삭제후보");
        std::fs::create_dir_all(&input).unwrap();
        write_at(&input.join("a.txt"), "same", 1_600_000_000);
        write_at(&input.join("b.txt"), "same", 1_700_000_000);

        let config = config_for(&quarantine);
        let sink = MemorySink::default();
        let report = Isolator::new(&config, &PlainText, &sink).isolate_all(&input, false).unwrap();

        assert_eq!(report.count(QuarantineReason::Duplicate), 1);
        assert!(input.join("b.txt").exists());
        assert!(!input.join("a.txt").exists());
        assert!(quarantine.join("중복파일/a.txt").exists());
        assert_eq!(report.quarantined[0].keeper, input.join("b.txt"));
    }

    #[test]
    fn test_stale_version_moved() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().canonicalize().unwrap();
        let input = base.join("in");
        let quarantine = base.join("삭제후보");
        std::fs::create_dir_all(&input).unwrap();
        write_at(&input.join("plan_v1.txt"), "분기 계획 초안입니다. 예산과 일정 포함.", 1_600_000_000);
        write_at(&input.join("plan_v2.txt"), "분기 계획 초안입니다. 예산과 일정 포함!", 1_700_000_000);
        write_at(&input.join("plan_v3.txt"), "전혀 다른 내용의 문서", 1_650_000_000);

        let config = config_for(&quarantine);
        let sink = MemorySink::default();
        let report = Isolator::new(&config, &PlainText, &sink).isolate_all(&input, false).unwrap();

        assert_eq!(report.count(QuarantineReason::StaleVersion), 1);
        assert!(quarantine.join("구버전/plan_v1.txt").exists());
        assert!(input.join("plan_v2.txt").exists());
        assert!(input.join("plan_v3.txt").exists());
    }

    #[test]
    fn test_quarantine_name_collision() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().canonicalize().unwrap();
        let input = base.join("in");
        let quarantine = base.join("삭제후보");
        std::fs::create_dir_all(input.join("x")).unwrap();
        std::fs::create_dir_all(input.join("y")).unwrap();
        std::fs::create_dir_all(quarantine.join("중복파일")).unwrap();
        std::fs::write(quarantine.join("중복파일/a.txt"), "earlier run").unwrap();
        write_at(&input.join("x/a.txt"), "dup", 1_600_000_000);
        write_at(&input.join("y/a.txt"), "dup", 1_500_000_000);
        write_at(&input.join("z.txt"), "dup", 1_700_000_000);

        let config = config_for(&quarantine);
        let report = Isolator::new(&config, &PlainText, &MemorySink::default())
            .isolate_all(&input, false)
            .unwrap();

        let mut destinations: Vec<PathBuf> = report.quarantined.iter().map(|q| q.destination.clone()).collect();
        destinations.sort();
        assert_eq!(
            destinations,
            vec![quarantine.join("중복파일/a_1.txt"), quarantine.join("중복파일/a_2.txt")]
        );
        assert!(input.join("z.txt").exists());
    }

    #[test]
    fn test_dry_run_moves_nothing() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().canonicalize().unwrap();
        let input = base.join("in");
        let quarantine = base.join("삭제후보");
        std::fs::create_dir_all(&input).unwrap();
        write_at(&input.join("a.txt"), "same", 1_600_000_000);
        write_at(&input.join("b.txt"), "same", 1_700_000_000);

        let config = config_for(&quarantine);
        let sink = MemorySink::default();
        let report = Isolator::new(&config, &PlainText, &sink).isolate_all(&input, true).unwrap();

        assert_eq!(report.quarantined.len(), 1);
        assert!(input.join("a.txt").exists());
        assert!(!quarantine.exists());
        assert!(sink.messages()[0].starts_with("[dry-run] a.txt → "));
    }

    #[test]
    fn test_nested_quarantine_root_not_scanned() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().canonicalize().unwrap();
        let input = base.join("in");
        let quarantine = input.join("삭제후보");
        std::fs::create_dir_all(quarantine.join("중복파일")).unwrap();
        write_at(&input.join("a.txt"), "same", 1_700_000_000);
        write_at(&quarantine.join("중복파일/a.txt"), "same", 1_600_000_000);

        let config = config_for(&quarantine);
        let report = Isolator::new(&config, &PlainText, &MemorySink::default())
            .isolate_all(&input, false)
            .unwrap();

        assert_eq!(report.scanned, 1);
        assert!(report.quarantined.is_empty());
    }
}
