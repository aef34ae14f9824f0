// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! File discovery and per-file records

use chrono::{DateTime, Local};
use once_cell::unsync::OnceCell;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::Result;

/// A discovered input file
#[derive(Debug)]
pub struct FileRecord {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub created: Option<SystemTime>,
    content_hash: OnceCell<String>,
}

impl FileRecord {
    /// Read timestamps for `path`
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)?;
        Ok(Self {
            modified: metadata.modified()?,
            created: metadata.created().ok(),
            path,
            content_hash: OnceCell::new(),
        })
    }

    /// BLAKE3 digest of the full content, computed on first use
    pub fn content_hash(&self) -> Result<&str> {
        self.content_hash
            .get_or_try_init(|| calculate_file_hash(&self.path))
            .map(String::as_str)
    }

    pub fn modified_local(&self) -> DateTime<Local> {
        DateTime::<Local>::from(self.modified)
    }

    pub fn file_name(&self) -> String {
        file_name(&self.path)
    }
}

/// Calculate file hash for deduplication
pub fn calculate_file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Final component of a path as an owned string
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Check if a file should be processed
pub fn should_process(path: &Path) -> bool {
    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };

    // Skip hidden files
    if filename.starts_with('.') {
        return false;
    }

    // Skip temporary files
    let temp_extensions = [".tmp", ".part", ".crdownload", ".partial", ".download"];
    if temp_extensions.iter().any(|ext| filename.ends_with(ext)) {
        return false;
    }

    // Office lock files
    if filename.starts_with("~$") {
        return false;
    }

    let skip_names = ["desktop.ini", "thumbs.db", ".ds_store"];
    !skip_names.iter().any(|n| filename.eq_ignore_ascii_case(n))
}

/// Absolute form of `path` with symlinks resolved as far as the path exists.
///
/// Roots that are not created yet (an output folder, a quarantine folder) resolve
/// through their nearest existing ancestor, so they compare equal to what a walk of
/// that ancestor yields once they exist.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut resolved = PathBuf::new();
    let mut missing = false;
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            part => {
                resolved.push(part);
                if !missing {
                    match resolved.canonicalize() {
                        Ok(canonical) => resolved = canonical,
                        Err(_) => missing = true,
                    }
                }
            }
        }
    }
    Ok(resolved)
}

/// Collect every processable file under `base`, or `base` itself if it is a file.
///
/// Returned paths are absolute. Anything under a directory listed in `exclude`
/// (output or quarantine roots nested inside the input) is skipped, however either
/// side was spelled. Results are sorted by path.
pub fn collect_file_paths(base: &Path, exclude: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let base = absolute_path(base)?;
    if base.is_file() {
        return Ok(vec![base]);
    }

    let exclude = exclude
        .iter()
        .map(|ex| absolute_path(ex))
        .collect::<Result<Vec<_>>>()?;

    let mut files = Vec::new();
    let walker = WalkDir::new(&base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !exclude.iter().any(|ex| entry.path().starts_with(ex))
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_file() && should_process(entry.path()) {
            files.push(entry.into_path());
        }
    }

    debug!("Collected {} files under {:?}", files.len(), base);
    Ok(files)
}

/// Render the directory tree under `root` with box-drawing pointers
pub fn render_directory_tree(root: &Path) -> Result<String> {
    let mut out = format!("{}\n", root.display());
    if root.is_dir() {
        render_level(root, "", &mut out)?;
    }
    Ok(out)
}

fn render_level(dir: &Path, prefix: &str, out: &mut String) -> Result<()> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();

    let count = names.len();
    for (i, name) in names.into_iter().enumerate() {
        let last = i + 1 == count;
        out.push_str(prefix);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(&name);
        out.push('\n');

        let child = dir.join(&name);
        if child.is_dir() {
            let extension = if last { "    " } else { "│   " };
            render_level(&child, &format!("{}{}", prefix, extension), out)?;
        }
    }
    Ok(())
}
