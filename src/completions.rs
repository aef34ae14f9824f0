// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Client for OpenAI-compatible `/v1/completions` servers (llama.cpp, LM Studio, vLLM)

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::EngineConfig;
use crate::model::{CompletionModel, ModelResponse};
use crate::ollama::transport_error;
use crate::{Result, TopicfoldError};

pub struct CompletionsClient {
    client: Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

impl CompletionsClient {
    pub fn new(engine: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(engine.timeout_secs))
            .build()?;

        let base = engine.url.trim_end_matches('/');
        let endpoint = if base.ends_with("/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/completions", base)
        } else {
            format!("{}/v1/completions", base)
        };

        Ok(Self {
            client,
            endpoint,
            model: engine.model.clone(),
        })
    }

    /// Resolved completions URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionModel for CompletionsClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn create_completion(&self, prompt: &str) -> Result<ModelResponse> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: 256,
            temperature: 0.5,
        };

        debug!("Sending completion request: model={}", self.model);

        let response = self.client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&self.endpoint, e))?;

        if !response.status().is_success() {
            return Err(TopicfoldError::ModelUnavailable(format!(
                "completion server returned status {}",
                response.status()
            )));
        }

        response
            .json::<ModelResponse>()
            .await
            .map_err(|e| TopicfoldError::MalformedResponse(e.to_string()))
    }
}
