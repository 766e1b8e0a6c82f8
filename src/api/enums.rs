use std::fmt;

use serde::{Deserialize, Serialize};

/// Execution path selector: self-hosted inference or a hosted API.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Local,
    Api,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Api => "api",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predefined analysis a long document can be put through.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    /// General structured synthesis. Also the fallback for unknown keys.
    #[default]
    ResumeGeneral,
    /// Recommendations, risks and lessons learned.
    SuiviEvaluation,
    /// Positive and negative opinions from interviews.
    AnalyseOpinions,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 3] = [
        Self::ResumeGeneral,
        Self::SuiviEvaluation,
        Self::AnalyseOpinions,
    ];

    /// Resolve a caller-supplied key. Unknown keys resolve to
    /// [`AnalysisType::ResumeGeneral`] instead of failing, so a stale or
    /// misspelled key from a front end still produces a synthesis.
    pub fn from_key(key: &str) -> Self {
        match key.trim() {
            "resume_general" => Self::ResumeGeneral,
            "suivi_evaluation" => Self::SuiviEvaluation,
            "analyse_opinions" => Self::AnalyseOpinions,
            other => {
                tracing::debug!("unknown analysis type {other:?}, using resume_general");
                Self::default()
            }
        }
    }

    /// Strict lookup used for configuration keys, where a typo is an error.
    pub fn from_config_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == key)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResumeGeneral => "resume_general",
            Self::SuiviEvaluation => "suivi_evaluation",
            Self::AnalyseOpinions => "analyse_opinions",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
