use serde::{Deserialize, Deserializer};

use crate::api::enums::{AnalysisType, Mode};
use crate::dispatch::AskRequest;
use crate::dispatch::gateway::AUTO_MODEL;
use crate::error::QualiaError;
use crate::orchestrator::AnalysisRequest;

pub const DEFAULT_SUMMARY_MIN_LENGTH: u32 = 30;
pub const DEFAULT_SUMMARY_MAX_LENGTH: u32 = 150;

fn default_model_choice() -> String {
    AUTO_MODEL.to_string()
}

fn default_min_length() -> u32 {
    DEFAULT_SUMMARY_MIN_LENGTH
}

fn default_max_length() -> u32 {
    DEFAULT_SUMMARY_MAX_LENGTH
}

/// Form fields of `POST /long-document-analysis`.
#[derive(Debug, Deserialize)]
pub struct AnalysisForm {
    /// `resume_general`, `suivi_evaluation` or `analyse_opinions`. Anything else means `resume_general`.
    #[serde(default)]
    pub analysis_type: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub mode: Mode,
    /// Local model name, `auto` for the default, or a hosted model name in api mode.
    #[serde(default = "default_model_choice")]
    pub model_choice: String,
}

impl From<AnalysisForm> for AnalysisRequest {
    fn from(form: AnalysisForm) -> Self {
        Self {
            analysis_type: AnalysisType::from_key(&form.analysis_type),
            context: form.context,
            mode: form.mode,
            model_choice: form.model_choice,
        }
    }
}

/// Form fields of `POST /ask-question`.
#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_model_choice")]
    pub model_choice: String,
}

impl AskForm {
    /// Both the context and the question must carry text.
    pub fn validate(&self) -> Result<(), QualiaError> {
        if self.context.trim().is_empty() {
            return Err(QualiaError::EmptyContext);
        }
        if self.question.trim().is_empty() {
            return Err(QualiaError::EmptyQuestion);
        }
        Ok(())
    }
}

impl From<AskForm> for AskRequest {
    fn from(form: AskForm) -> Self {
        Self {
            context: form.context,
            question: form.question,
            mode: form.mode,
            model_choice: form.model_choice,
        }
    }
}

/// Form fields of `POST /summarize-context`.
#[derive(Debug, Deserialize)]
pub struct SummarizeForm {
    #[serde(default)]
    pub context: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_audio: bool,
    #[serde(default = "default_min_length")]
    pub min_length: u32,
    #[serde(default = "default_max_length")]
    pub max_length: u32,
}

impl SummarizeForm {
    /// Automatic summaries are only offered for transcribed audio.
    pub fn validate(&self) -> Result<(), QualiaError> {
        if !self.is_audio {
            return Err(QualiaError::InvalidInput(
                "Le résumé automatique est uniquement disponible pour les fichiers audio transcrits."
                    .to_string(),
            ));
        }
        if self.context.trim().is_empty() {
            return Err(QualiaError::EmptyContext);
        }
        if self.min_length > self.max_length {
            return Err(QualiaError::InvalidInput(format!(
                "min_length ({}) doit être inférieur ou égal à max_length ({})",
                self.min_length, self.max_length
            )));
        }
        Ok(())
    }
}

/// Accepts the boolean spellings HTML forms and Python clients send.
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean, got {other:?}"
        ))),
    }
}
