//! Hugging Face Inference API text generation.
//!
//! API reference: https://huggingface.co/docs/api-inference/tasks/text-generation

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use wxagent_core::NarrativeConfig;

use crate::narrative::{GenerationError, NarrativeGenerator, NarrativeRequest};
use crate::prompt::build_prompt;

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
    options: GenerationOptions,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f64,
    return_full_text: bool,
}

#[derive(Debug, Serialize)]
struct GenerationOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

/// Hugging Face hosted model client.
pub struct HuggingFaceClient {
    client: Client,
    base_url: String,
    model: String,
    api_token: String,
    max_new_tokens: u32,
    temperature: f64,
}

impl std::fmt::Debug for HuggingFaceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl HuggingFaceClient {
    /// Create a client. An absent token is sent as an empty bearer and
    /// rejected upstream; `Config::validate` refuses it at startup.
    pub fn new(config: &NarrativeConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_token: config.api_token.clone().unwrap_or_default(),
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
        })
    }

    /// Send a raw prompt and return the trimmed completion.
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    pub async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        let body = GenerationRequest {
            inputs: prompt,
            parameters: GenerationParameters {
                max_new_tokens: self.max_new_tokens,
                temperature: self.temperature,
                return_full_text: false,
            },
            options: GenerationOptions {
                wait_for_model: true,
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            tracing::warn!("Inference API returned {}: {}", status, message);
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let generated: Vec<GeneratedText> = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let text = generated
            .into_iter()
            .next()
            .map(|g| g.generated_text.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        tracing::debug!("Generated {} characters", text.len());
        Ok(text)
    }
}

impl NarrativeGenerator for HuggingFaceClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &NarrativeRequest<'_>) -> Result<String, GenerationError> {
        let prompt = build_prompt(request)?;
        self.complete(&prompt).await
    }
}
