use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;

use crate::api::enums::Mode;
use crate::config::Config;
use crate::dispatch::gemini::GeminiDispatch;
use crate::dispatch::ollama::OllamaDispatch;
use crate::dispatch::{AskRequest, Generate, TextStream, TokenResultStream};
use crate::error::QualiaError;
use crate::prompts;

/// Model sentinel meaning "use the configured default local model".
pub const AUTO_MODEL: &str = "auto";

/// Hosted backends reachable in API mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiBackend {
    Gemini,
}

impl ApiBackend {
    /// Pick the hosted backend for a model choice by substring.
    pub fn for_model(model_choice: &str) -> Self {
        match model_choice.to_lowercase() {
            m if m.contains("gemini") => Self::Gemini,
            // Gemini is the only hosted provider; any other choice lands there too.
            _ => Self::Gemini,
        }
    }
}

/// Build the shared HTTP client used by every upstream collaborator.
pub fn build_client() -> Result<Client, QualiaError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(4)
        .build()
        .map_err(QualiaError::Request)
}

/// Routes completion requests to the local Ollama host or a hosted API.
pub struct Gateway {
    ollama: OllamaDispatch,
    gemini: Option<GeminiDispatch>,
    default_model: String,
}

impl Gateway {
    pub fn new(ollama: OllamaDispatch, gemini: Option<GeminiDispatch>, default_model: String) -> Self {
        Self {
            ollama,
            gemini,
            default_model,
        }
    }

    pub fn from_config(config: &Config, client: Client) -> Self {
        let ollama = OllamaDispatch::new(
            client.clone(),
            config.ollama.host.clone(),
            config.request_timeout,
        );
        let gemini = config
            .gemini
            .clone()
            .map(|g| GeminiDispatch::new(client, g, config.request_timeout));
        Self::new(ollama, gemini, config.ollama.default_model.clone())
    }

    /// Concrete local model name for a caller's choice.
    pub fn resolve_local_model(&self, model_choice: &str) -> String {
        let choice = model_choice.trim();
        if choice.is_empty() || choice == AUTO_MODEL {
            self.default_model.clone()
        } else {
            choice.to_string()
        }
    }

    fn ask_local(&self, req: AskRequest) -> TextStream {
        let model = self.resolve_local_model(&req.model_choice);
        let prompt = if req.question.is_empty() {
            req.context
        } else if prompts::is_reasoning_model(&model) {
            prompts::reasoning_prompt(&req.context, &req.question)
        } else {
            prompts::question_prompt(&req.context, &req.question)
        };
        tracing::info!("ask: mode=local model={model}");

        with_diagnostic(self.ollama.stream_generate(&model, prompt), |e| {
            format!("\n\n--- ERREUR ---\nErreur de connexion à Ollama : {}", e.user_message())
        })
    }

    fn ask_api(&self, req: AskRequest) -> TextStream {
        let prompt = if req.question.is_empty() {
            req.context
        } else {
            prompts::question_prompt(&req.context, &req.question)
        };

        match ApiBackend::for_model(&req.model_choice) {
            ApiBackend::Gemini => {
                let Some(gemini) = &self.gemini else {
                    tracing::warn!("api mode requested but no Gemini key is configured");
                    return single(
                        "Erreur: aucune clé API Gemini n'est configurée (GOOGLE_API_KEY).".to_string(),
                    );
                };
                tracing::info!("ask: mode=api model={}", gemini.model());
                with_diagnostic(gemini.stream_generate(prompt), |e| {
                    format!("Erreur avec l'API Gemini : {}", e.user_message())
                })
            }
        }
    }
}

impl Generate for Gateway {
    fn ask(&self, req: AskRequest) -> TextStream {
        match req.mode {
            Mode::Local => self.ask_local(req),
            Mode::Api => self.ask_api(req),
        }
    }
}

/// Re-yield tokens verbatim; the first error becomes the final element.
fn with_diagnostic(inner: TokenResultStream, render: fn(&QualiaError) -> String) -> TextStream {
    Box::pin(async_stream::stream! {
        let mut inner = inner;
        while let Some(item) = inner.next().await {
            match item {
                Ok(token) => {
                    yield token;
                }
                Err(e) => {
                    tracing::warn!(
                        "generation stream failed (provider={}): {e}",
                        e.provider().unwrap_or("unknown")
                    );
                    yield render(&e);
                    break;
                }
            }
        }
    })
}

fn single(text: String) -> TextStream {
    Box::pin(futures_util::stream::once(async move { text }))
}
