use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::{Config, SummarizerBackend};
use crate::dispatch::ollama::OllamaDispatch;
use crate::dispatch::{check_status, request_error};
use crate::error::QualiaError;

/// Length bounds used for each chunk during the map stage.
pub const CHUNK_MIN_LENGTH: u32 = 40;
pub const CHUNK_MAX_LENGTH: u32 = 200;

/// Prefix steering seq2seq summarizers toward French summaries.
const SUMMARY_PREFIX: &str = "résume ce texte: ";

/// Non-streaming summarization collaborator. Each call may fail independently.
#[async_trait]
pub trait Summarize: Send + Sync {
    async fn summarize(
        &self,
        text: &str,
        min_length: u32,
        max_length: u32,
    ) -> Result<String, QualiaError>;
}

/// Dedicated summarization service: `POST {base_url}/summarize`.
pub struct HttpSummarizer {
    client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct SummaryBody {
    summary: Option<String>,
}

impl HttpSummarizer {
    pub fn new(client: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Summarize for HttpSummarizer {
    async fn summarize(
        &self,
        text: &str,
        min_length: u32,
        max_length: u32,
    ) -> Result<String, QualiaError> {
        let url = format!("{}/summarize", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "text": format!("{SUMMARY_PREFIX}{text}"),
            "min_length": min_length,
            "max_length": max_length,
        });

        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout))?;
        let response = check_status(response, "summarizer").await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| request_error(e, self.timeout))?;
        let parsed: SummaryBody = serde_json::from_slice(&bytes)
            .map_err(|e| QualiaError::SchemaParse(format!("summarizer response: {e}")))?;

        parsed
            .summary
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| QualiaError::Upstream {
                provider: "summarizer".to_string(),
                message: "summary field is empty or missing".to_string(),
                status: None,
            })
    }
}

/// Summaries from the local generation host when no dedicated service exists.
/// The length bounds become an instruction in the prompt.
pub struct OllamaSummarizer {
    ollama: OllamaDispatch,
    model: String,
}

impl OllamaSummarizer {
    pub fn new(ollama: OllamaDispatch, model: impl Into<String>) -> Self {
        Self {
            ollama,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Summarize for OllamaSummarizer {
    async fn summarize(
        &self,
        text: &str,
        min_length: u32,
        max_length: u32,
    ) -> Result<String, QualiaError> {
        let prompt = format!(
            "{SUMMARY_PREFIX}{text}\n\nLe résumé doit compter entre {min_length} et {max_length} mots. Réponds uniquement avec le résumé."
        );
        self.ollama.generate(&self.model, &prompt).await
    }
}

pub fn summarizer_from_config(config: &Config, client: Client) -> Arc<dyn Summarize> {
    match &config.summarizer {
        SummarizerBackend::Http { base_url } => {
            tracing::info!("summarizer: http service at {base_url}");
            Arc::new(HttpSummarizer::new(
                client,
                base_url.clone(),
                config.request_timeout,
            ))
        }
        SummarizerBackend::Ollama { model } => {
            tracing::info!("summarizer: ollama model {model}");
            let ollama = OllamaDispatch::new(
                client,
                config.ollama.host.clone(),
                config.request_timeout,
            );
            Arc::new(OllamaSummarizer::new(ollama, model.clone()))
        }
    }
}
