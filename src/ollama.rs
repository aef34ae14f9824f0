// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Ollama API client for local AI inference

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::model::{CompletionModel, ModelResponse};
use crate::{Result, TopicfoldError};

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    retries: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

/// Map transport failures to `ModelUnavailable` so callers can tell them apart
pub(crate) fn transport_error(base_url: &str, e: reqwest::Error) -> TopicfoldError {
    if e.is_timeout() || e.is_connect() {
        TopicfoldError::ModelUnavailable(format!("{}: {}", base_url, e))
    } else {
        TopicfoldError::Api(e)
    }
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(engine: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(engine.timeout_secs))
            .build()?;

        // Normalize URL
        let base_url = engine.url
            .trim_end_matches('/')
            .replace("/api/generate", "")
            .replace("/api/chat", "");

        Ok(Self {
            client,
            base_url,
            model: engine.model.clone(),
            retries: engine.retries,
        })
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                TopicfoldError::ModelUnavailable(format!(
                    "Cannot connect to Ollama at {}: {}",
                    self.base_url, e
                ))
            })?;

        Ok(())
    }

    /// List available models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&self.base_url, e))?;

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Check if the configured model is available
    pub async fn model_available(&self) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| {
            m.starts_with(&self.model) || m == &format!("{}:latest", self.model)
        }))
    }

    /// Generate text completion
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        debug!("Sending request to Ollama: model={}", self.model);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&self.base_url, e))?;

        if !response.status().is_success() {
            return Err(TopicfoldError::ModelUnavailable(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TopicfoldError::MalformedResponse(e.to_string()))?;
        Ok(result.response)
    }

    /// Generate with retry logic
    pub async fn generate_with_retry(&self, prompt: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                warn!("Retrying Ollama request in {:?} (attempt {})", delay, attempt + 1);
                tokio::time::sleep(delay).await;
            }

            match self.generate(prompt).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            TopicfoldError::ModelUnavailable("Unknown error".to_string())
        }))
    }
}

#[async_trait]
impl CompletionModel for OllamaClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn create_completion(&self, prompt: &str) -> Result<ModelResponse> {
        let text = self.generate_with_retry(prompt).await?;
        Ok(ModelResponse::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppConfig;

    #[test]
    fn test_base_url_normalized() {
        let mut engine = AppConfig::default().ai_engine;
        engine.url = "http://localhost:11434/api/generate/".to_string();
        let client = OllamaClient::new(&engine).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.name(), "llama3.2:3b");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_model_unavailable() {
        let mut engine = AppConfig::default().ai_engine;
        engine.url = "http://127.0.0.1:9".to_string();
        engine.retries = 0;
        engine.timeout_secs = 2;
        let client = OllamaClient::new(&engine).unwrap();

        let err = client.create_completion("hello").await.unwrap_err();
        assert!(matches!(err, TopicfoldError::ModelUnavailable(_)));
    }
}
