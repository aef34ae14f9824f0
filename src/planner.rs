// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Turning file placements into collision-free move operations

use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::extract::extension;
use crate::scan::{file_name, FileRecord};

/// How an operation relocates its source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Rename, or copy then delete across volumes
    #[default]
    Move,
    /// Leave the source and create a hard link at the destination
    Hardlink,
}

/// One planned relocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub link_type: LinkType,
    /// Relative folder the file was planned into
    pub category: String,
}

/// A file and the folder it belongs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub file_path: PathBuf,
    /// Relative folder; `/` separates nested segments such as `2024/2분기/알고리즘`
    pub category: String,
    /// Replacement file stem; the original extension is kept
    pub new_name: Option<String>,
}

impl Placement {
    pub fn new(file_path: impl Into<PathBuf>, category: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            category: category.into(),
            new_name: None,
        }
    }
}

/// Dedup state shared across planning passes of one run
#[derive(Debug, Default)]
pub struct PlanState {
    /// Sources already planned
    pub processed: HashSet<PathBuf>,
    /// Destinations already claimed
    pub renamed: HashSet<PathBuf>,
}

impl PlanState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Plan one operation per not-yet-processed placement.
///
/// Destinations are `output_root/<category segments>/<file name>`. A destination that
/// is already claimed in `state`, or already exists on disk, gets `_1`, `_2`, ...
/// inserted before the extension until it is free.
pub fn plan_operations(
    placements: &[Placement],
    output_root: &Path,
    state: &mut PlanState,
    link_type: LinkType,
) -> Vec<Operation> {
    let mut operations = Vec::new();

    for placement in placements {
        if !state.processed.insert(placement.file_path.clone()) {
            continue;
        }

        let dir = category_dir(output_root, &placement.category);
        let target_name = target_file_name(placement);
        let destination = free_destination(&dir, &target_name, &state.renamed);

        state.renamed.insert(destination.clone());
        operations.push(Operation {
            source: placement.file_path.clone(),
            destination,
            link_type,
            category: placement.category.clone(),
        });
    }

    operations
}

fn category_dir(output_root: &Path, category: &str) -> PathBuf {
    category
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .fold(output_root.to_path_buf(), |dir, segment| dir.join(segment))
}

fn target_file_name(placement: &Placement) -> String {
    let original = file_name(&placement.file_path);
    match &placement.new_name {
        Some(stem) if !stem.is_empty() => match placement.file_path.extension() {
            Some(ext) => format!("{}.{}", stem, ext.to_string_lossy()),
            None => stem.clone(),
        },
        _ => original,
    }
}

/// `name` with `_n` inserted before its extension
pub fn with_suffix(name: &str, n: usize) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}_{}", stem, n),
    }
}

fn free_destination(dir: &Path, name: &str, claimed: &HashSet<PathBuf>) -> PathBuf {
    let mut candidate = dir.join(name);
    let mut counter = 1;
    while claimed.contains(&candidate) || candidate.exists() {
        candidate = dir.join(with_suffix(name, counter));
        counter += 1;
    }
    candidate
}

/// `<year>/<N분기>` for a timestamp
pub fn quarter_segments(time: DateTime<Local>) -> String {
    let quarter = (time.month() - 1) / 3 + 1;
    format!("{}/{}분기", time.year(), quarter)
}

/// Plan into `<YYYY>/<MM월>` folders by modification time
pub fn plan_by_date(
    files: &[FileRecord],
    output_root: &Path,
    state: &mut PlanState,
    link_type: LinkType,
) -> Vec<Operation> {
    let placements: Vec<Placement> = files
        .iter()
        .map(|f| {
            let modified = f.modified_local();
            Placement::new(&f.path, format!("{}/{:02}월", modified.year(), modified.month()))
        })
        .collect();
    plan_operations(&placements, output_root, state, link_type)
}

/// Bucket name for a file extension
pub fn type_bucket(path: &Path) -> &'static str {
    match extension(path).as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tiff" => "이미지",
        "txt" | "md" | "docx" | "doc" | "pdf" | "xls" | "xlsx" | "csv" | "ppt" | "pptx" => "문서",
        _ => "기타",
    }
}

/// Plan into 이미지 / 문서 / 기타 folders by extension; dotfiles are skipped
pub fn plan_by_type(
    files: &[PathBuf],
    output_root: &Path,
    state: &mut PlanState,
    link_type: LinkType,
) -> Vec<Operation> {
    let placements: Vec<Placement> = files
        .iter()
        .filter(|p| !file_name(p).starts_with('.'))
        .map(|p| Placement::new(p, type_bucket(p)))
        .collect();
    plan_operations(&placements, output_root, state, link_type)
}

#[derive(Default)]
struct TreeNode {
    children: BTreeMap<String, TreeNode>,
}

/// Render planned destinations as a tree rooted at `output_root`
pub fn render_plan_tree(operations: &[Operation], output_root: &Path) -> String {
    let mut root = TreeNode::default();
    for op in operations {
        let relative = op.destination.strip_prefix(output_root).unwrap_or(&op.destination);
        let mut node = &mut root;
        for component in relative.components() {
            let key = component.as_os_str().to_string_lossy().into_owned();
            node = node.children.entry(key).or_default();
        }
    }

    let mut out = format!("{}\n", output_root.display());
    render_node(&root, "", &mut out);
    out
}

fn render_node(node: &TreeNode, prefix: &str, out: &mut String) {
    let count = node.children.len();
    for (i, (name, child)) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        out.push_str(prefix);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(name);
        out.push('\n');
        let extension = if last { "    " } else { "│   " };
        render_node(child, &format!("{}{}", prefix, extension), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_duplicate_source_dropped() {
        let placements = vec![Placement::new("a/x.txt", "doc"), Placement::new("a/x.txt", "doc")];
        let mut state = PlanState::new();
        let ops = plan_operations(&placements, Path::new("/nonexistent/out"), &mut state, LinkType::Move);

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].destination, PathBuf::from("/nonexistent/out/doc/x.txt"));
    }

    #[test]
    fn test_collision_suffix() {
        let placements = vec![
            Placement::new("a/x.txt", "doc"),
            Placement::new("b/x.txt", "doc"),
            Placement::new("c/x.txt", "doc"),
        ];
        let mut state = PlanState::new();
        let ops = plan_operations(&placements, Path::new("/nonexistent/out"), &mut state, LinkType::Move);

        let destinations: Vec<_> = ops.iter().map(|o| o.destination.clone()).collect();
        assert_eq!(
            destinations,
            vec![
                PathBuf::from("/nonexistent/out/doc/x.txt"),
                PathBuf::from("/nonexistent/out/doc/x_1.txt"),
                PathBuf::from("/nonexistent/out/doc/x_2.txt"),
            ]
        );
    }

    #[test]
    fn test_state_shared_across_passes() {
        let mut state = PlanState::new();
        let root = Path::new("/nonexistent/out");
        let first = plan_operations(&[Placement::new("a/x.txt", "doc")], root, &mut state, LinkType::Move);
        let second = plan_operations(
            &[Placement::new("a/x.txt", "other"), Placement::new("b/x.txt", "doc")],
            root,
            &mut state,
            LinkType::Move,
        );

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].destination, root.join("doc/x_1.txt"));
    }

    #[test]
    fn test_existing_file_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir_all(out.join("알고리즘")).unwrap();
        std::fs::write(out.join("알고리즘/sort.pdf"), "old").unwrap();

        let mut state = PlanState::new();
        let ops = plan_operations(&[Placement::new("in/sort.pdf", "알고리즘")], &out, &mut state, LinkType::Move);
        assert_eq!(ops[0].destination, out.join("알고리즘/sort_1.pdf"));
    }

    #[test]
    fn test_nested_category_and_new_name() {
        let mut placement = Placement::new("in/scan0001.pdf", "2024/2분기/알고리즘");
        placement.new_name = Some("quick_sort_notes".to_string());

        let mut state = PlanState::new();
        let ops = plan_operations(&[placement], Path::new("/out"), &mut state, LinkType::Hardlink);
        assert_eq!(ops[0].destination, PathBuf::from("/out/2024/2분기/알고리즘/quick_sort_notes.pdf"));
        assert_eq!(ops[0].link_type, LinkType::Hardlink);
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("x.txt", 1), "x_1.txt");
        assert_eq!(with_suffix("archive.tar.gz", 2), "archive.tar_2.gz");
        assert_eq!(with_suffix("README", 3), "README_3");
        assert_eq!(with_suffix(".bashrc", 1), ".bashrc_1");
    }

    #[test]
    fn test_quarter_segments() {
        let t = Local.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap();
        assert_eq!(quarter_segments(t), "2024/2분기");
        let t = Local.with_ymd_and_hms(2023, 12, 31, 12, 0, 0).unwrap();
        assert_eq!(quarter_segments(t), "2023/4분기");
    }

    #[test]
    fn test_plan_by_type() {
        let files = vec![
            PathBuf::from("in/photo.JPG"),
            PathBuf::from("in/report.docx"),
            PathBuf::from("in/song.mp3"),
            PathBuf::from("in/.env"),
        ];
        let mut state = PlanState::new();
        let ops = plan_by_type(&files, Path::new("/out"), &mut state, LinkType::Move);
        let destinations: Vec<_> = ops.iter().map(|o| o.destination.clone()).collect();
        assert_eq!(
            destinations,
            vec![
                PathBuf::from("/out/이미지/photo.JPG"),
                PathBuf::from("/out/문서/report.docx"),
                PathBuf::from("/out/기타/song.mp3"),
            ]
        );
    }

    #[test]
    fn test_plan_by_date() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memo.txt");
        std::fs::write(&path, "x").unwrap();
        let when = Local.with_ymd_and_hms(2023, 3, 9, 10, 0, 0).unwrap();
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(when.timestamp(), 0)).unwrap();

        let record = FileRecord::from_path(&path).unwrap();
        let mut state = PlanState::new();
        let ops = plan_by_date(&[record], Path::new("/out"), &mut state, LinkType::Move);
        assert_eq!(ops[0].destination, PathBuf::from("/out/2023/03월/memo.txt"));
    }

    #[test]
    fn test_render_plan_tree() {
        let root = Path::new("/out");
        let placements = vec![
            Placement::new("in/b.pdf", "알고리즘"),
            Placement::new("in/a.pdf", "알고리즘"),
            Placement::new("in/c.md", "네트워크"),
        ];
        let mut state = PlanState::new();
        let ops = plan_operations(&placements, root, &mut state, LinkType::Move);

        let tree = render_plan_tree(&ops, root);
        let lines: Vec<&str> = tree.lines().collect();
        assert_eq!(
            lines,
            vec!["/out", "├── 네트워크", "│   └── c.md", "└── 알고리즘", "    ├── a.pdf", "    └── b.pdf"]
        );
    }
}
