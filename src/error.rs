use thiserror::Error;

#[derive(Debug, Error)]
pub enum QualiaError {
    #[error("context is empty")]
    EmptyContext,

    #[error("question is empty")]
    EmptyQuestion,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid chunking: size {size} must exceed overlap {overlap}, and overlap must be positive")]
    InvalidChunking { size: usize, overlap: usize },

    #[error("timeout after {0}s")]
    Timeout(u64),

    #[error("upstream error from {provider}: {message}")]
    Upstream {
        provider: String,
        message: String,
        status: Option<u16>,
    },

    #[error("{provider} is not configured")]
    NotConfigured { provider: String },

    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("no text could be extracted from {0}")]
    EmptyExtraction(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl QualiaError {
    /// Extract provider name from structured error variants.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Upstream { provider, .. } => Some(provider),
            Self::NotConfigured { provider } => Some(provider),
            _ => None,
        }
    }

    /// True for errors caused by the caller's input rather than by a collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyContext
                | Self::EmptyQuestion
                | Self::InvalidInput(_)
                | Self::UnsupportedFormat(_)
                | Self::EmptyExtraction(_)
                | Self::NotConfigured { .. }
        )
    }

    /// Produce a message safe for returning to HTTP clients and for inline
    /// stream diagnostics. Does not leak internal URLs or connection details.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyContext => "Le contexte est vide.".to_string(),
            Self::EmptyQuestion => "La question est vide.".to_string(),
            Self::InvalidInput(msg) => msg.clone(),
            Self::InvalidChunking { size, overlap } => {
                format!("paramètres de découpage invalides (taille {size}, chevauchement {overlap})")
            }
            Self::Timeout(secs) => format!("délai dépassé après {secs}s"),
            Self::Upstream {
                provider,
                message,
                status,
            } => match status {
                Some(code) => format!("{provider} a répondu {code}: {message}"),
                None => format!("{provider}: {message}"),
            },
            Self::NotConfigured { provider } => format!("{provider} n'est pas configuré"),
            Self::SchemaParse(_) => "réponse du fournisseur illisible".to_string(),
            Self::Request(e) if e.is_timeout() => "délai de la requête dépassé".to_string(),
            Self::Request(e) if e.is_connect() => "connexion impossible au service".to_string(),
            Self::Request(_) => "la requête vers le service a échoué".to_string(),
            Self::UnsupportedFormat(_) => "Format de fichier non supporté.".to_string(),
            Self::EmptyExtraction(_) => "Fichier vide ou contenu non extrait.".to_string(),
            Self::Config(msg) => format!("configuration invalide: {msg}"),
        }
    }
}
