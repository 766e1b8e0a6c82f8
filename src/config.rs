use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::chunker::ChunkParams;
use crate::error::QualiaError;
use crate::prompts::PromptRegistry;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_LOCAL_MODEL: &str = "codellama:latest";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Large documents through a large local model legitimately take many minutes.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 900;
const CONFIG_FILE_NAME: &str = "qualia.toml";

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub host: String,
    /// Model used when the caller sends the `auto` sentinel.
    pub default_model: String,
    pub standard_models: Vec<String>,
    pub reasoning_models: Vec<String>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            default_model: DEFAULT_LOCAL_MODEL.to_string(),
            standard_models: vec![
                "auto".to_string(),
                "codellama:latest".to_string(),
                "llava:latest".to_string(),
            ],
            reasoning_models: vec![
                "phi4-mini-reasoning:latest".to_string(),
                "deepseek-r1:8b".to_string(),
            ],
        }
    }
}

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Where chunk summaries come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummarizerBackend {
    /// Dedicated summarization service (`POST {base_url}/summarize`).
    Http { base_url: String },
    /// Non-streaming generation on the local Ollama host.
    Ollama { model: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub request_timeout: Duration,
    pub chunking: ChunkParams,
    pub ollama: OllamaConfig,
    /// None when no API key is available; API mode then reports it inline.
    pub gemini: Option<GeminiConfig>,
    pub summarizer: SummarizerBackend,
    pub transcriber_url: Option<String>,
    pub extractor_url: Option<String>,
    pub prompts: PromptRegistry,
}

impl Default for Config {
    fn default() -> Self {
        let ollama = OllamaConfig::default();
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            chunking: ChunkParams::default(),
            summarizer: SummarizerBackend::Ollama {
                model: ollama.default_model.clone(),
            },
            ollama,
            gemini: None,
            transcriber_url: None,
            extractor_url: None,
            prompts: PromptRegistry::builtin(),
        }
    }
}

/// On-disk shape of `qualia.toml`. Every field is optional; missing ones keep defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub bind: Option<String>,
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub chunking: ChunkingSection,
    #[serde(default)]
    pub ollama: OllamaSection,
    #[serde(default)]
    pub gemini: GeminiSection,
    #[serde(default)]
    pub summarizer: SummarizerSection,
    pub transcriber_url: Option<String>,
    pub extractor_url: Option<String>,
    /// Analysis type key → template containing `{summaries}`.
    #[serde(default)]
    pub prompts: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkingSection {
    pub size: Option<usize>,
    pub overlap: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaSection {
    pub host: Option<String>,
    pub default_model: Option<String>,
    pub standard_models: Option<Vec<String>>,
    pub reasoning_models: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummarizerSection {
    pub url: Option<String>,
    pub model: Option<String>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self, QualiaError> {
        toml::from_str(text).map_err(|e| QualiaError::Config(e.to_string()))
    }

    pub fn read(path: &Path) -> Result<Self, QualiaError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| QualiaError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&text)
    }
}

impl Config {
    /// Defaults, then the TOML file (`QUALIA_CONFIG` or `./qualia.toml`), then
    /// environment variables.
    pub fn load() -> Result<Self, QualiaError> {
        let file = match config_path() {
            Some(path) => {
                tracing::info!("loading configuration from {}", path.display());
                FileConfig::read(&path)?
            }
            None => FileConfig::default(),
        };
        Self::resolve(file, |key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    /// Merge a parsed file with an environment lookup. Environment wins.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, QualiaError> {
        let defaults = Config::default();

        let bind_addr = env("QUALIA_BIND")
            .or(file.bind)
            .unwrap_or(defaults.bind_addr);

        let timeout_secs = match env("QUALIA_REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse_number("QUALIA_REQUEST_TIMEOUT_SECS", &raw)?,
            None => file
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            return Err(QualiaError::Config(
                "request timeout must be at least 1 second".to_string(),
            ));
        }

        let size = match env("QUALIA_CHUNK_SIZE") {
            Some(raw) => parse_number("QUALIA_CHUNK_SIZE", &raw)?,
            None => file.chunking.size.unwrap_or(defaults.chunking.size()),
        };
        let overlap = match env("QUALIA_CHUNK_OVERLAP") {
            Some(raw) => parse_number("QUALIA_CHUNK_OVERLAP", &raw)?,
            None => file.chunking.overlap.unwrap_or(defaults.chunking.overlap()),
        };
        let chunking = ChunkParams::new(size, overlap)?;

        let ollama = OllamaConfig {
            host: env("OLLAMA_HOST")
                .or(file.ollama.host)
                .unwrap_or(defaults.ollama.host),
            default_model: env("QUALIA_DEFAULT_MODEL")
                .or(file.ollama.default_model)
                .unwrap_or(defaults.ollama.default_model),
            standard_models: file
                .ollama
                .standard_models
                .unwrap_or(defaults.ollama.standard_models),
            reasoning_models: file
                .ollama
                .reasoning_models
                .unwrap_or(defaults.ollama.reasoning_models),
        };

        let gemini = match env("GOOGLE_API_KEY").or(file.gemini.api_key) {
            Some(api_key) => Some(GeminiConfig {
                api_key,
                model: env("GEMINI_MODEL")
                    .or(file.gemini.model)
                    .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: env("GEMINI_BASE_URL")
                    .or(file.gemini.base_url)
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            }),
            None => {
                tracing::warn!("GOOGLE_API_KEY not set; api mode unavailable");
                None
            }
        };

        let summarizer = match env("QUALIA_SUMMARIZER_URL").or(file.summarizer.url) {
            Some(base_url) => SummarizerBackend::Http { base_url },
            None => SummarizerBackend::Ollama {
                model: env("QUALIA_SUMMARIZER_MODEL")
                    .or(file.summarizer.model)
                    .unwrap_or_else(|| ollama.default_model.clone()),
            },
        };

        let transcriber_url = env("QUALIA_TRANSCRIBER_URL").or(file.transcriber_url);
        if transcriber_url.is_none() {
            tracing::warn!("QUALIA_TRANSCRIBER_URL not set; audio uploads unavailable");
        }
        let extractor_url = env("QUALIA_EXTRACTOR_URL").or(file.extractor_url);
        if extractor_url.is_none() {
            tracing::warn!("QUALIA_EXTRACTOR_URL not set; pdf/docx/xlsx uploads unavailable");
        }

        let prompts = PromptRegistry::with_overrides(&file.prompts)?;

        Ok(Config {
            bind_addr,
            request_timeout: Duration::from_secs(timeout_secs),
            chunking,
            ollama,
            gemini,
            summarizer,
            transcriber_url,
            extractor_url,
            prompts,
        })
    }
}

fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("QUALIA_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    local.exists().then_some(local)
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, QualiaError> {
    raw.trim()
        .parse()
        .map_err(|_| QualiaError::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}
