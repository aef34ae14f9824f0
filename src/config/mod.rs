// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for topicfold

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::planner::LinkType;
use crate::similarity::Strategy;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// AI engine configuration
    pub ai_engine: EngineConfig,

    /// Classification layers
    #[serde(default)]
    pub classify: ClassifyConfig,

    /// Filename grouping before classification
    #[serde(default)]
    pub grouping: GroupingConfig,

    /// Folder-name merging
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Output layout
    #[serde(default)]
    pub output: OutputConfig,

    /// Duplicate and stale-version isolation
    #[serde(default)]
    pub isolate: IsolateConfig,

    /// Log file locations
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Prompt templates
    #[serde(default)]
    pub prompts: PromptConfig,
}

/// Which model binding to talk to
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Ollama `/api/generate`
    Ollama,
    /// OpenAI-compatible `/v1/completions`
    Completions,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_backend")]
    pub backend: Backend,
    pub url: String,
    pub model: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

/// First classification layer
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassifyMode {
    /// One model call per file, keyed on the filename
    Filename,
    /// One model call per group of similar filenames
    Grouped,
    /// One model call for the whole batch
    Bulk,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClassifyConfig {
    #[serde(default = "default_mode")]
    pub mode: ClassifyMode,
    /// Retry files the first layer could not place using their extracted text
    #[serde(default = "default_true")]
    pub content_fallback: bool,
    /// Characters of document text sent with a content prompt
    #[serde(default = "default_content_chars")]
    pub content_chars: usize,
    /// Few-shot examples injected into bulk prompts
    #[serde(default = "default_max_examples")]
    pub max_examples: usize,
    /// File unclassifiable documents under the sentinel folder instead of leaving them
    #[serde(default)]
    pub place_unclassified: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GroupingConfig {
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,
    #[serde(default = "default_token_threshold")]
    pub token_threshold: f64,
    #[serde(default = "default_sequence_threshold")]
    pub sequence_threshold: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReconcileConfig {
    #[serde(default = "default_cutoff")]
    pub cutoff: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    /// Folder created next to the input directory when no output is given
    #[serde(default = "default_output_dir_name")]
    pub dir_name: String,
    /// Insert `<year>/<N분기>` above the category folder
    #[serde(default)]
    pub segment_by_quarter: bool,
    #[serde(default = "default_true")]
    pub preserve_filename: bool,
    #[serde(default)]
    pub link_type: LinkType,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IsolateConfig {
    /// Quarantine root; defaults to `<dir_parent>/삭제후보`
    #[serde(default)]
    pub quarantine_dir: Option<String>,
    #[serde(default = "default_duplicate_folder")]
    pub duplicate_folder: String,
    #[serde(default = "default_stale_folder")]
    pub stale_folder: String,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Silent-mode message log
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// Example log read for few-shot hints and appended after classification
    #[serde(default = "default_log_file")]
    pub hint_log: String,
    /// JSONL journal of executed moves
    #[serde(default = "default_history_file")]
    pub history_file: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_filename_prompt")]
    pub filename: String,
    #[serde(default = "default_content_prompt")]
    pub content: String,
    #[serde(default = "default_group_prompt")]
    pub group: String,
    #[serde(default = "default_bulk_prompt")]
    pub bulk: String,
    #[serde(default = "default_rename_prompt")]
    pub rename: String,
}

// Default value functions
fn default_backend() -> Backend { Backend::Ollama }
fn default_timeout() -> u64 { 120 }
fn default_retries() -> u32 { 2 }
fn default_true() -> bool { true }
fn default_mode() -> ClassifyMode { ClassifyMode::Filename }
fn default_content_chars() -> usize { 1000 }
fn default_max_examples() -> usize { 50 }
fn default_strategy() -> Strategy { Strategy::TokenSet }
fn default_token_threshold() -> f64 { 0.5 }
fn default_sequence_threshold() -> f64 { 0.7 }
fn default_cutoff() -> f64 { 0.65 }
fn default_output_dir_name() -> String { "organized_folder".to_string() }
fn default_duplicate_folder() -> String { "중복파일".to_string() }
fn default_stale_folder() -> String { "구버전".to_string() }
fn default_similarity_threshold() -> f64 { 0.85 }
fn default_log_file() -> String { "operation_log.txt".to_string() }
fn default_history_file() -> String { "topicfold_history.jsonl".to_string() }

fn default_filename_prompt() -> String {
    "아래는 파일 이름입니다. 이 이름을 보고 어떤 주제(폴더명)로 정리하면 좋을지 \
     한 단어나 두 단어로 알려줘.\n\
     예: 정규화, 알고리즘, 자료구조, 데이터베이스 등.".to_string()
}

fn default_content_prompt() -> String {
    "아래는 문서 내용의 앞부분입니다. 이 문서를 어떤 주제(폴더명)로 정리하면 좋을지 \
     한국어 한 단어나 두 단어로 알려줘.".to_string()
}

fn default_group_prompt() -> String {
    "아래 파일들은 이름이 비슷한 한 묶음입니다. 이 묶음 전체에 어울리는 주제(폴더명)를 \
     한국어 한 단어나 두 단어로 알려줘.".to_string()
}

fn default_bulk_prompt() -> String {
    "아래 파일 이름들을 주제별로 묶고 각 묶음에 한국어 폴더명을 붙여줘. \
     한 줄에 한 묶음씩 다음 형식만 사용해: [폴더명] → 파일1, 파일2".to_string()
}

fn default_rename_prompt() -> String {
    "Summarize this document into a concise filename (max 5 words). \
     Use snake_case. Return ONLY the filename.".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ai_engine: EngineConfig {
                backend: default_backend(),
                url: "http://localhost:11434/api/generate".to_string(),
                model: "llama3.2:3b".to_string(),
                timeout_secs: default_timeout(),
                retries: default_retries(),
            },
            classify: ClassifyConfig::default(),
            grouping: GroupingConfig::default(),
            reconcile: ReconcileConfig::default(),
            output: OutputConfig::default(),
            isolate: IsolateConfig::default(),
            logging: LoggingConfig::default(),
            prompts: PromptConfig::default(),
        }
    }
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            content_fallback: true,
            content_chars: default_content_chars(),
            max_examples: default_max_examples(),
            place_unclassified: false,
        }
    }
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            token_threshold: default_token_threshold(),
            sequence_threshold: default_sequence_threshold(),
        }
    }
}

impl GroupingConfig {
    /// Threshold matching the configured strategy
    pub fn threshold(&self) -> f64 {
        match self.strategy {
            Strategy::TokenSet => self.token_threshold,
            Strategy::CharSequence => self.sequence_threshold,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { cutoff: default_cutoff() }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir_name: default_output_dir_name(),
            segment_by_quarter: false,
            preserve_filename: true,
            link_type: LinkType::default(),
        }
    }
}

impl Default for IsolateConfig {
    fn default() -> Self {
        Self {
            quarantine_dir: None,
            duplicate_folder: default_duplicate_folder(),
            stale_folder: default_stale_folder(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

impl IsolateConfig {
    /// Quarantine root for a scanned directory
    pub fn quarantine_root(&self, directory: &Path) -> PathBuf {
        match &self.quarantine_dir {
            Some(dir) => PathBuf::from(dir),
            None => directory
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or(directory)
                .join("삭제후보"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            hint_log: default_log_file(),
            history_file: default_history_file(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            filename: default_filename_prompt(),
            content: default_content_prompt(),
            group: default_group_prompt(),
            bulk: default_bulk_prompt(),
            rename: default_rename_prompt(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::TopicfoldError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject thresholds outside `[0, 1]`
    pub fn validate(&self) -> crate::Result<()> {
        let thresholds = [
            ("grouping.token_threshold", self.grouping.token_threshold),
            ("grouping.sequence_threshold", self.grouping.sequence_threshold),
            ("reconcile.cutoff", self.reconcile.cutoff),
            ("isolate.similarity_threshold", self.isolate.similarity_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(crate::TopicfoldError::Config(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }
        if self.ai_engine.model.trim().is_empty() {
            return Err(crate::TopicfoldError::Config("ai_engine.model is empty".to_string()));
        }
        Ok(())
    }
}
