// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Text-generation model boundary
//!
//! Every classifier call goes through [`CompletionModel`]. The orchestrator builds one
//! handle at startup and lends it to each call.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{Backend, EngineConfig};
use crate::{Result, TopicfoldError};

/// A single generated choice of a completion-style response
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub text: String,
}

/// Response shapes a model binding can hand back
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ModelResponse {
    /// Object exposing a `text` field
    Text { text: String },
    /// Completion object, answer in `choices[0].text`
    Completion { choices: Vec<Choice> },
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The single response string, or an error when the shape carries none
    pub fn into_text(self) -> Result<String> {
        match self {
            Self::Text { text } => Ok(text),
            Self::Completion { choices } => choices
                .into_iter()
                .next()
                .map(|c| c.text)
                .ok_or_else(|| TopicfoldError::MalformedResponse("completion has no choices".to_string())),
        }
    }
}

/// Anything that turns a prompt into a response
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Identifier used in log lines
    fn name(&self) -> &str;

    /// Run one blocking request/response round trip
    async fn create_completion(&self, prompt: &str) -> Result<ModelResponse>;
}

/// Build the binding selected in the configuration
pub fn from_config(engine: &EngineConfig) -> Result<Box<dyn CompletionModel>> {
    let model: Box<dyn CompletionModel> = match engine.backend {
        Backend::Ollama => Box::new(crate::ollama::OllamaClient::new(engine)?),
        Backend::Completions => Box::new(crate::completions::CompletionsClient::new(engine)?),
    };
    Ok(model)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_shape() {
        let response: ModelResponse = serde_json::from_str(r#"{"text": "카테고리: 알고리즘"}"#).unwrap();
        assert_eq!(response.into_text().unwrap(), "카테고리: 알고리즘");
    }

    #[test]
    fn test_completion_shape() {
        let response: ModelResponse =
            serde_json::from_str(r#"{"id": "cmpl-1", "choices": [{"text": "자료구조", "index": 0}]}"#).unwrap();
        assert_eq!(response.into_text().unwrap(), "자료구조");
    }

    #[test]
    fn test_empty_choices_is_malformed() {
        let response: ModelResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(response.into_text(), Err(TopicfoldError::MalformedResponse(_))));
    }
}
