// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! The classification-and-placement pipeline
//!
//! Files flow through the configured first layer, then the content fallback for
//! whatever the first layer could not place, then label reconciliation, and finally
//! the planner. The plan is fully built before anything is moved.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::category::UNCLASSIFIED;
use crate::classifier::{ClassificationResult, Classifier};
use crate::config::{AppConfig, ClassifyMode};
use crate::extract::TextExtractor;
use crate::hints::HintLog;
use crate::model::CompletionModel;
use crate::planner::{
    plan_by_date, plan_by_type, plan_operations, quarter_segments, render_plan_tree, Operation, PlanState,
    Placement,
};
use crate::registry::CategoryRegistry;
use crate::scan::FileRecord;
use crate::sink::Sink;
use crate::{Result, TopicfoldError};

/// How files are sorted into folders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizeMode {
    /// Model label per file name
    Filename,
    /// Model label per group of similar names
    Grouped,
    /// One model call for the whole batch
    Bulk,
    /// `<YYYY>/<MM월>` by modification time
    Date,
    /// 이미지 / 문서 / 기타 by extension
    Type,
}

impl OrganizeMode {
    /// Classification layer used by the model-backed modes
    pub fn classify_mode(self) -> Option<ClassifyMode> {
        match self {
            Self::Filename => Some(ClassifyMode::Filename),
            Self::Grouped => Some(ClassifyMode::Grouped),
            Self::Bulk => Some(ClassifyMode::Bulk),
            Self::Date | Self::Type => None,
        }
    }
}

impl From<ClassifyMode> for OrganizeMode {
    fn from(mode: ClassifyMode) -> Self {
        match mode {
            ClassifyMode::Filename => Self::Filename,
            ClassifyMode::Grouped => Self::Grouped,
            ClassifyMode::Bulk => Self::Bulk,
        }
    }
}

impl FromStr for OrganizeMode {
    type Err = TopicfoldError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "filename" => Ok(Self::Filename),
            "grouped" => Ok(Self::Grouped),
            "bulk" => Ok(Self::Bulk),
            "date" => Ok(Self::Date),
            "type" => Ok(Self::Type),
            other => Err(TopicfoldError::Config(format!("Unknown organize mode: {}", other))),
        }
    }
}

/// Planned operations plus what could not be placed
#[derive(Debug, Default)]
pub struct OrganizePlan {
    pub operations: Vec<Operation>,
    /// Files left where they are because no layer produced a label
    pub unplaced: Vec<PathBuf>,
}

impl OrganizePlan {
    /// Destination tree under `output_root`, for the confirmation gate
    pub fn preview(&self, output_root: &Path) -> String {
        render_plan_tree(&self.operations, output_root)
    }
}

/// Pipeline orchestrator; borrows the model handle for the whole run
pub struct Organizer<'a> {
    config: &'a AppConfig,
    model: &'a dyn CompletionModel,
    extractor: &'a dyn TextExtractor,
    sink: &'a dyn Sink,
    hints: Option<&'a HintLog>,
}

impl<'a> Organizer<'a> {
    pub fn new(
        config: &'a AppConfig,
        model: &'a dyn CompletionModel,
        extractor: &'a dyn TextExtractor,
        sink: &'a dyn Sink,
    ) -> Self {
        Self {
            config,
            model,
            extractor,
            sink,
            hints: None,
        }
    }

    pub fn with_hints(mut self, hints: &'a HintLog) -> Self {
        self.hints = Some(hints);
        self
    }

    fn classifier(&self) -> Classifier<'a> {
        let classifier = Classifier::new(self.model, self.sink, self.config);
        match self.hints {
            Some(hints) => classifier.with_hints(hints),
            None => classifier,
        }
    }

    /// First layer, then content classification for whatever it left unplaced
    pub async fn classify(&self, files: &[PathBuf], mode: ClassifyMode) -> Vec<ClassificationResult> {
        let classifier = self.classifier();
        let mut results = classifier.classify_batch(files, mode).await;

        if !self.config.classify.content_fallback {
            return results;
        }

        for result in results.iter_mut().filter(|r| !r.is_placed()) {
            let Some(text) = self.extractor.read_file_data(&result.file_path) else {
                debug!("No readable content for {:?}", result.file_path);
                continue;
            };
            if text.trim().is_empty() {
                continue;
            }
            let retried = classifier.classify_content(&result.file_path, &text).await;
            if retried.is_placed() || result.category.is_none() {
                *result = retried;
            }
        }

        results
    }

    /// Build the full plan for `files` into `output_root`
    pub async fn plan(
        &self,
        files: &[PathBuf],
        output_root: &Path,
        mode: OrganizeMode,
        state: &mut PlanState,
    ) -> Result<OrganizePlan> {
        let link_type = self.config.output.link_type;

        let Some(classify_mode) = mode.classify_mode() else {
            let operations = match mode {
                OrganizeMode::Date => {
                    let records = load_records(files);
                    plan_by_date(&records, output_root, state, link_type)
                }
                _ => plan_by_type(files, output_root, state, link_type),
            };
            return Ok(OrganizePlan {
                operations,
                unplaced: Vec::new(),
            });
        };

        info!("Classifying {} files ({:?})", files.len(), classify_mode);
        let results = self.classify(files, classify_mode).await;

        let mut registry = CategoryRegistry::new(self.config.reconcile.cutoff);
        let mut placements = Vec::new();
        let mut unplaced = Vec::new();

        for result in results {
            let label = match result.category.as_deref() {
                Some(label) if result.is_placed() => registry.reconcile(label),
                _ if self.config.classify.place_unclassified => UNCLASSIFIED.to_string(),
                _ => {
                    unplaced.push(result.file_path);
                    continue;
                }
            };

            let category = if self.config.output.segment_by_quarter {
                match placement_time(&result.file_path) {
                    Some(time) => format!("{}/{}", quarter_segments(time), label),
                    None => label,
                }
            } else {
                label
            };

            let mut placement = Placement::new(result.file_path, category);
            if !self.config.output.preserve_filename {
                let text = self.extractor.read_file_data(&placement.file_path);
                placement.new_name = Some(
                    self.classifier()
                        .suggest_filename(&placement.file_path, text.as_deref())
                        .await,
                );
            }
            placements.push(placement);
        }

        if !unplaced.is_empty() {
            warn!("{} files could not be classified and stay in place", unplaced.len());
        }
        debug!("{} distinct folders after reconciliation", registry.len());

        Ok(OrganizePlan {
            operations: plan_operations(&placements, output_root, state, link_type),
            unplaced,
        })
    }
}

fn load_records(files: &[PathBuf]) -> Vec<FileRecord> {
    files
        .iter()
        .filter_map(|path| match FileRecord::from_path(path) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                None
            }
        })
        .collect()
}

/// Creation time where the platform has one, else modification time
fn placement_time(path: &Path) -> Option<DateTime<Local>> {
    match FileRecord::from_path(path) {
        Ok(record) => Some(DateTime::<Local>::from(record.created.unwrap_or(record.modified))),
        Err(e) => {
            warn!("No timestamps for {:?}: {}", path, e);
            None
        }
    }
}
