//! Answer generation provider abstraction and implementations.
//!
//! Defines the [`AnswerGenerator`] trait and concrete implementations:
//! - **[`DisabledGenerator`]** always returns errors; used when generation is
//!   not configured. Chat falls back to a canned answer.
//! - **[`OllamaGenerator`]** calls a local Ollama instance's `/api/generate`
//!   endpoint with retry and backoff.
//!
//! The retry strategy is the same as the embedding provider's: 429 and 5xx
//! retry with exponential backoff, other 4xx fail immediately, network
//! errors retry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::GenerationConfig;
use crate::error::GenerationUnavailable;

/// Default Ollama endpoint when `generation.url` is not configured.
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Interface to the answer generation service.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Returns the model identifier (e.g. `"llama3.2"`).
    fn model_name(&self) -> &str;
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationUnavailable>;
    /// Whether the backing service is currently reachable.
    async fn is_ready(&self) -> bool;
}

// ============ Disabled Provider ============

/// A no-op generator that always returns errors.
///
/// Used when `generation.provider = "disabled"` in the configuration.
pub struct DisabledGenerator;

#[async_trait]
impl AnswerGenerator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationUnavailable> {
        Err(GenerationUnavailable(
            "generation provider is disabled".to_string(),
        ))
    }
    async fn is_ready(&self) -> bool {
        false
    }
}

// ============ Ollama Provider ============

/// Generator using a local Ollama instance.
///
/// Calls `POST {url}/api/generate` with `stream: false` and the configured
/// sampling options. The model must already be pulled, e.g.
/// `ollama pull llama3.2`.
pub struct OllamaGenerator {
    model: String,
    url: String,
    temperature: f32,
    num_predict: u32,
    top_p: f32,
    repeat_penalty: f32,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaGenerator {
    /// Create a new Ollama generator from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` is not set in config.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model,
            url,
            temperature: config.temperature,
            num_predict: config.num_predict,
            top_p: config.top_p,
            repeat_penalty: config.repeat_penalty,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl AnswerGenerator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationUnavailable> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.num_predict,
                "top_p": self.top_p,
                "repeat_penalty": self.repeat_penalty,
            },
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/api/generate", self.url))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await.map_err(|e| {
                            GenerationUnavailable(format!("invalid generate response: {}", e))
                        })?;
                        return parse_generate_response(&json);
                    }

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(GenerationUnavailable(format!(
                            "Ollama API error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    // Client error (not 429): don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(GenerationUnavailable(format!(
                        "Ollama API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(GenerationUnavailable(format!(
                        "cannot reach Ollama at {}: {}",
                        self.url, e
                    )));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| GenerationUnavailable("generation failed after retries".to_string())))
    }

    /// Probe `GET {url}/api/tags`; any successful status counts as ready.
    async fn is_ready(&self) -> bool {
        match self.client.get(format!("{}/api/tags", self.url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Parse the Ollama generate API response JSON, extracting `response`.
fn parse_generate_response(json: &serde_json::Value) -> Result<String, GenerationUnavailable> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| {
            GenerationUnavailable("invalid generate response: missing response field".to_string())
        })
}

/// Create the appropriate [`AnswerGenerator`] based on configuration.
///
/// # Errors
///
/// Returns an error for unknown provider names or if the Ollama provider
/// cannot be initialized (missing model).
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn AnswerGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate_response() {
        let json = serde_json::json!({
            "model": "llama3.2",
            "response": "  The ball is red.  ",
            "done": true,
        });
        assert_eq!(parse_generate_response(&json).unwrap(), "The ball is red.");
    }

    #[test]
    fn test_parse_generate_response_missing_field() {
        let json = serde_json::json!({ "done": true });
        assert!(parse_generate_response(&json).is_err());
    }

    #[tokio::test]
    async fn test_disabled_generator_errors_and_is_not_ready() {
        let gen = DisabledGenerator;
        assert!(gen.generate("hello").await.is_err());
        assert!(!gen.is_ready().await);
    }

    #[test]
    fn test_create_generator_requires_model() {
        let mut config = GenerationConfig::default();
        config.provider = "ollama".to_string();
        assert!(create_generator(&config).is_err());
        config.model = Some("llama3.2".to_string());
        assert!(create_generator(&config).is_ok());
    }
}
