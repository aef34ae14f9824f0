// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Prompting the model for folder labels
//!
//! Every variant shares one contract: build a prompt, ask the model, extract a label.
//! Any failure along the way yields `category: None`; nothing here returns an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::category::{clean_label, extract_category, validate_label, UNCLASSIFIED};
use crate::config::{AppConfig, ClassifyMode};
use crate::hints::{render_examples, HintLog, GROUP_LINE, LABEL_MARKER};
use crate::model::CompletionModel;
use crate::normalize::{sanitize_filename, UNNAMED};
use crate::scan::file_name;
use crate::similarity::group_by_similarity;
use crate::sink::Sink;

/// Longest model-suggested file stem
const MAX_NAME_CHARS: usize = 50;
/// Most words kept from a model-suggested file stem
const MAX_NAME_WORDS: usize = 5;

/// Label decided for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub file_path: PathBuf,
    /// `None` when classification failed and the next layer should try
    pub category: Option<String>,
}

impl ClassificationResult {
    pub fn new(file_path: impl Into<PathBuf>, category: Option<String>) -> Self {
        Self {
            file_path: file_path.into(),
            category,
        }
    }

    /// A real label, not a failure and not the empty-answer sentinel
    pub fn is_placed(&self) -> bool {
        matches!(self.category.as_deref(), Some(c) if c != UNCLASSIFIED)
    }
}

/// Prompt construction and answer handling around a borrowed model
pub struct Classifier<'a> {
    model: &'a dyn CompletionModel,
    sink: &'a dyn Sink,
    config: &'a AppConfig,
    hints: Option<&'a HintLog>,
}

impl<'a> Classifier<'a> {
    pub fn new(model: &'a dyn CompletionModel, sink: &'a dyn Sink, config: &'a AppConfig) -> Self {
        Self {
            model,
            sink,
            config,
            hints: None,
        }
    }

    /// Read few-shot examples from, and record labels to, `hints`
    pub fn with_hints(mut self, hints: &'a HintLog) -> Self {
        self.hints = Some(hints);
        self
    }

    /// Raw answer text, or `None` on any model fault
    async fn ask(&self, prompt: &str) -> Option<String> {
        let response = match self.model.create_completion(prompt).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Model '{}' failed: {}", self.model.name(), e);
                return None;
            }
        };
        match response.into_text() {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Unusable response from '{}': {}", self.model.name(), e);
                None
            }
        }
    }

    /// Ask and extract; a model fault gives `None`, an empty answer the sentinel
    async fn ask_label(&self, prompt: &str) -> Option<String> {
        let answer = self.ask(prompt).await?;
        debug!("Model answer: {:?}", answer);
        extract_category(Some(&answer))
    }

    fn report(&self, name: &str, category: Option<&str>) {
        self.sink.emit(&format!("[AI 응답] {} -> {}", name, category.unwrap_or("분류 실패")));
    }

    fn record_single(&self, name: &str, category: Option<&str>) {
        if let (Some(hints), Some(label)) = (self.hints, category) {
            if label != UNCLASSIFIED {
                if let Err(e) = hints.append_single(name, label) {
                    warn!("Failed to record example: {}", e);
                }
            }
        }
    }

    fn record_group(&self, label: &str, names: &[String]) {
        if let Some(hints) = self.hints {
            if label != UNCLASSIFIED {
                if let Err(e) = hints.append_group(label, names) {
                    warn!("Failed to record examples: {}", e);
                }
            }
        }
    }

    /// One call keyed on the file name
    pub async fn classify_filename(&self, path: &Path) -> ClassificationResult {
        let name = file_name(path);
        let prompt = format!("{}\n파일 이름: {}\n카테고리:", self.config.prompts.filename, name);

        let category = self.ask_label(&prompt).await;
        self.report(&name, category.as_deref());
        self.record_single(&name, category.as_deref());
        ClassificationResult::new(path, category)
    }

    /// One call keyed on the start of the document text
    pub async fn classify_content(&self, path: &Path, text: &str) -> ClassificationResult {
        let name = file_name(path);
        let excerpt: String = text.chars().take(self.config.classify.content_chars).collect();
        let prompt = format!(
            "{}\n파일 이름: {}\n내용:\n{}\n카테고리:",
            self.config.prompts.content, name, excerpt
        );

        let category = self.ask_label(&prompt).await;
        self.report(&name, category.as_deref());
        self.record_single(&name, category.as_deref());
        ClassificationResult::new(path, category)
    }

    /// One call per group of similar names; every member gets the group's label
    pub async fn classify_grouped(&self, files: &[PathBuf]) -> Vec<ClassificationResult> {
        let grouping = &self.config.grouping;
        let groups = group_by_similarity(files, grouping.strategy, grouping.threshold());
        debug!("{} files formed {} groups", files.len(), groups.len());

        let mut categories: Vec<Option<String>> = vec![None; files.len()];
        for group in groups {
            let names: Vec<String> = group.iter().map(|&i| file_name(&files[i])).collect();
            let listing: String = names.iter().map(|n| format!("- {}\n", n)).collect();
            let prompt = format!("{}\n파일 목록:\n{}카테고리:", self.config.prompts.group, listing);

            let category = self.ask_label(&prompt).await;
            self.sink.emit(&format!(
                "[AI 응답] 묶음 {}개 ({}) -> {}",
                names.len(),
                names.join(", "),
                category.as_deref().unwrap_or("분류 실패")
            ));
            if let Some(label) = &category {
                self.record_group(label, &names);
            }
            for &i in &group {
                categories[i] = category.clone();
            }
        }

        files
            .iter()
            .zip(categories)
            .map(|(path, category)| ClassificationResult::new(path, category))
            .collect()
    }

    /// One call for the whole batch; the model both partitions and names.
    ///
    /// Files the answer does not mention get `None`.
    pub async fn classify_bulk(&self, files: &[PathBuf]) -> Vec<ClassificationResult> {
        let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();

        let mut prompt = self.config.prompts.bulk.clone();
        if let Some(hints) = self.hints {
            match hints.load_examples(self.config.classify.max_examples) {
                Ok(examples) if !examples.is_empty() => {
                    prompt.push_str("\n\n이전 분류 예시:\n");
                    prompt.push_str(&render_examples(&examples));
                }
                Ok(_) => {}
                Err(e) => warn!("Could not read examples from {:?}: {}", hints.path(), e),
            }
        }
        prompt.push_str("\n\n파일 목록:\n");
        for name in &names {
            prompt.push_str(&format!("- {}\n", name));
        }

        let mapping = match self.ask(&prompt).await {
            Some(answer) => parse_bulk_answer(&answer),
            None => HashMap::new(),
        };

        let mut by_label: Vec<(String, Vec<String>)> = Vec::new();
        let results: Vec<ClassificationResult> = files
            .iter()
            .zip(&names)
            .map(|(path, name)| {
                let category = mapping.get(name.as_str()).cloned();
                self.report(name, category.as_deref());
                if let Some(label) = &category {
                    match by_label.iter_mut().find(|(l, _)| l == label) {
                        Some((_, members)) => members.push(name.clone()),
                        None => by_label.push((label.clone(), vec![name.clone()])),
                    }
                }
                ClassificationResult::new(path, category)
            })
            .collect();

        for (label, members) in &by_label {
            self.record_group(label, members);
        }
        results
    }

    /// Run the configured first layer over `files`, one model call at a time
    pub async fn classify_batch(&self, files: &[PathBuf], mode: ClassifyMode) -> Vec<ClassificationResult> {
        match mode {
            ClassifyMode::Filename => {
                let mut results = Vec::with_capacity(files.len());
                for path in files {
                    results.push(self.classify_filename(path).await);
                }
                results
            }
            ClassifyMode::Grouped => self.classify_grouped(files).await,
            ClassifyMode::Bulk => self.classify_bulk(files).await,
        }
    }

    /// Short descriptive file stem; falls back to the sanitized original name
    pub async fn suggest_filename(&self, path: &Path, text: Option<&str>) -> String {
        let name = file_name(path);
        let mut prompt = format!("{}\n\nFile name: {}", self.config.prompts.rename, name);
        if let Some(text) = text {
            let excerpt: String = text.chars().take(self.config.classify.content_chars).collect();
            prompt.push_str(&format!("\n\nDocument content:\n{}", excerpt));
        }

        let suggested = self
            .ask(&prompt)
            .await
            .and_then(|answer| answer.lines().map(str::trim).find(|l| !l.is_empty()).map(String::from))
            .map(|line| sanitize_filename(&line, MAX_NAME_CHARS, MAX_NAME_WORDS))
            .filter(|stem| stem != UNNAMED);

        suggested.unwrap_or_else(|| sanitize_filename(&name, MAX_NAME_CHARS, MAX_NAME_WORDS))
    }
}

/// File name → validated label pairs from `[label] → a, b` lines
pub fn parse_bulk_answer(answer: &str) -> HashMap<String, String> {
    let mut mapping = HashMap::new();

    for line in answer.lines() {
        let Some(caps) = GROUP_LINE.captures(line) else { continue };
        let (Some(raw_label), Some(list)) = (caps.get(1), caps.get(2)) else { continue };
        if raw_label.as_str().trim() == LABEL_MARKER {
            continue;
        }
        let Some(label) = validate_label(&clean_label(raw_label.as_str())) else {
            debug!("Rejected bulk label {:?}", raw_label.as_str());
            continue;
        };

        for file in list.as_str().split(',') {
            let file = file.trim().trim_matches(|c| matches!(c, '"' | '\'' | '`'));
            let file = file_name(Path::new(file));
            if !file.is_empty() {
                mapping.entry(file).or_insert_with(|| label.clone());
            }
        }
    }

    mapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedModel;
    use crate::model::ModelResponse;
    use crate::similarity::Strategy;
    use crate::sink::MemorySink;
    use crate::TopicfoldError;
    use tempfile::TempDir;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from("/in").join(n)).collect()
    }

    #[tokio::test]
    async fn test_filename_classification() {
        let model = ScriptedModel::texts(&["카테고리: 알고리즘"]);
        let sink = MemorySink::default();
        let config = AppConfig::default();
        let classifier = Classifier::new(&model, &sink, &config);

        let result = classifier.classify_filename(Path::new("/in/quick_sort.pdf")).await;
        assert_eq!(result.category.as_deref(), Some("알고리즘"));
        assert!(result.is_placed());

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("파일 이름: quick_sort.pdf"));
        assert!(prompts[0].ends_with("카테고리:"));
        assert_eq!(sink.messages(), vec!["[AI 응답] quick_sort.pdf -> 알고리즘"]);
    }

    #[test]
    fn test_model_fault_degrades_to_none() {
        let model = ScriptedModel::new(vec![Err(TopicfoldError::ModelUnavailable("down".to_string()))]);
        let sink = MemorySink::default();
        let config = AppConfig::default();
        let classifier = Classifier::new(&model, &sink, &config);

        let result = tokio_test::block_on(classifier.classify_filename(Path::new("/in/a.txt")));
        assert_eq!(result.category, None);
        assert!(!result.is_placed());
    }

    #[tokio::test]
    async fn test_empty_and_degenerate_answers() {
        let model = ScriptedModel::new(vec![
            Ok(ModelResponse::text("")),
            Ok(ModelResponse::text("기타")),
            Ok(ModelResponse::Completion { choices: vec![] }),
        ]);
        let sink = MemorySink::default();
        let config = AppConfig::default();
        let classifier = Classifier::new(&model, &sink, &config);

        let empty = classifier.classify_filename(Path::new("/in/a.txt")).await;
        assert_eq!(empty.category.as_deref(), Some(UNCLASSIFIED));
        assert!(!empty.is_placed());

        let other = classifier.classify_filename(Path::new("/in/b.txt")).await;
        assert_eq!(other.category, None);

        let malformed = classifier.classify_filename(Path::new("/in/c.txt")).await;
        assert_eq!(malformed.category, None);
    }

    #[tokio::test]
    async fn test_content_prompt_is_truncated() {
        let model = ScriptedModel::texts(&["정규화"]);
        let sink = MemorySink::default();
        let mut config = AppConfig::default();
        config.classify.content_chars = 10;
        let classifier = Classifier::new(&model, &sink, &config);

        let text = "가".repeat(50);
        let result = classifier.classify_content(Path::new("/in/scan.pdf"), &text).await;
        assert_eq!(result.category.as_deref(), Some("정규화"));

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains(&"가".repeat(10)));
        assert!(!prompts[0].contains(&"가".repeat(11)));
    }

    #[tokio::test]
    async fn test_grouped_makes_one_call_per_group() {
        let model = ScriptedModel::texts(&["카테고리: 운영체제", "카테고리: 네트워크"]);
        let sink = MemorySink::default();
        let mut config = AppConfig::default();
        config.grouping.strategy = Strategy::TokenSet;
        let classifier = Classifier::new(&model, &sink, &config);

        let files = paths(&["os_week1.pdf", "tcp_handshake.md", "os_week2.pdf"]);
        let results = classifier.classify_grouped(&files).await;

        assert_eq!(model.prompt_count(), 2);
        let categories: Vec<_> = results.iter().map(|r| r.category.as_deref()).collect();
        assert_eq!(categories, vec![Some("운영체제"), Some("네트워크"), Some("운영체제")]);
    }

    #[tokio::test]
    async fn test_grouped_label_is_validated() {
        let model = ScriptedModel::texts(&["unknown"]);
        let sink = MemorySink::default();
        let config = AppConfig::default();
        let classifier = Classifier::new(&model, &sink, &config);

        let results = classifier.classify_grouped(&paths(&["a_1.txt", "a_2.txt"])).await;
        assert!(results.iter().all(|r| r.category.is_none()));
    }

    #[tokio::test]
    async fn test_bulk_maps_by_basename_and_injects_examples() {
        let dir = TempDir::new().unwrap();
        let hints = HintLog::new(dir.path().join("operation_log.txt"));
        hints.append_single("old_sort.pdf", "알고리즘").unwrap();

        let answer = "다음과 같이 묶었습니다.\n\
                      [알고리즘] → quick_sort.pdf, heap.pdf\n\
                      [기타] → misc.bin\n\
                      [데이터베이스] -> \"erd.png\"";
        let model = ScriptedModel::texts(&[answer]);
        let sink = MemorySink::default();
        let config = AppConfig::default();
        let classifier = Classifier::new(&model, &sink, &config).with_hints(&hints);

        let files = paths(&["quick_sort.pdf", "heap.pdf", "misc.bin", "erd.png", "lost.txt"]);
        let results = classifier.classify_bulk(&files).await;

        assert_eq!(model.prompt_count(), 1);
        let prompt = model.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("[알고리즘] → old_sort.pdf"));
        assert!(prompt.contains("- lost.txt"));

        let categories: Vec<_> = results.iter().map(|r| r.category.as_deref()).collect();
        assert_eq!(
            categories,
            vec![Some("알고리즘"), Some("알고리즘"), None, Some("데이터베이스"), None]
        );

        let log = std::fs::read_to_string(hints.path()).unwrap();
        assert!(log.contains("[알고리즘] → quick_sort.pdf, heap.pdf"));
        assert!(log.contains("[데이터베이스] → erd.png"));
    }

    #[tokio::test]
    async fn test_bulk_model_fault_leaves_everything_unplaced() {
        let model = ScriptedModel::new(vec![Err(TopicfoldError::ModelUnavailable("down".to_string()))]);
        let sink = MemorySink::default();
        let config = AppConfig::default();
        let classifier = Classifier::new(&model, &sink, &config);

        let results = classifier.classify_bulk(&paths(&["a.txt", "b.txt"])).await;
        assert!(results.iter().all(|r| r.category.is_none()));
    }

    #[tokio::test]
    async fn test_suggest_filename() {
        let model = ScriptedModel::texts(&["Quick Sort Lecture Notes Week Three Extra.txt", ""]);
        let sink = MemorySink::default();
        let config = AppConfig::default();
        let classifier = Classifier::new(&model, &sink, &config);

        let name = classifier.suggest_filename(Path::new("/in/scan001.pdf"), Some("본문")).await;
        assert_eq!(name, "quick_sort_lecture_notes_week");

        let fallback = classifier.suggest_filename(Path::new("/in/My Notes.pdf"), None).await;
        assert_eq!(fallback, "my_notes");
    }

    #[test]
    fn test_parse_bulk_answer_skips_marker_and_junk() {
        let mapping = parse_bulk_answer("[분류] a.txt → 알고리즘\n[자료구조] → dir/stack.md , queue.md\nhello");
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("stack.md").map(String::as_str), Some("자료구조"));
        assert_eq!(mapping.get("queue.md").map(String::as_str), Some("자료구조"));
    }
}
