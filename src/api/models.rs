use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Shown in place of hosted models when no API key is configured.
pub const API_NOT_CONFIGURED: &str = "api_non_configuree";
pub const GEMINI_CHOICE: &str = "gemini-flash";

/// Model choices offered to front ends, per mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelsResponse {
    pub local_standard: Vec<String>,
    pub local_reasoning: Vec<String>,
    pub api: Vec<String>,
}

impl From<&Config> for ModelsResponse {
    fn from(config: &Config) -> Self {
        let api = if config.gemini.is_some() {
            vec![GEMINI_CHOICE.to_string()]
        } else {
            vec![API_NOT_CONFIGURED.to_string()]
        };
        Self {
            local_standard: config.ollama.standard_models.clone(),
            local_reasoning: config.ollama.reasoning_models.clone(),
            api,
        }
    }
}
