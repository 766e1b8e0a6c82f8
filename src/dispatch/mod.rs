pub mod gateway;
pub mod gemini;
pub mod ollama;

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;

use crate::api::enums::Mode;
use crate::error::QualiaError;

/// Lazy sequence of text elements. Nothing upstream happens until polled,
/// and dropping the stream abandons any in-flight request.
pub type TextStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// One completion request as the gateway sees it.
#[derive(Debug, Clone)]
pub struct AskRequest {
    pub context: String,
    /// Empty means `context` already is the full prompt (analysis calls).
    pub question: String,
    pub mode: Mode,
    pub model_choice: String,
}

impl AskRequest {
    /// Full-prompt request: the rendered template is sent verbatim.
    pub fn full_prompt(prompt: String, mode: Mode, model_choice: impl Into<String>) -> Self {
        Self {
            context: prompt,
            question: String::new(),
            mode,
            model_choice: model_choice.into(),
        }
    }
}

/// "Ask a model for a completion", as an incremental token stream.
///
/// Implementations never fail the stream: upstream problems arrive as a final
/// diagnostic text element, so the transport always completes normally.
pub trait Generate: Send + Sync {
    fn ask(&self, req: AskRequest) -> TextStream;
}

/// Fallible token stream produced by a single backend, before the gateway
/// folds failures into a diagnostic element.
pub type TokenResultStream = Pin<Box<dyn Stream<Item = Result<String, QualiaError>> + Send>>;

/// Cap on how much of an error body is quoted back in diagnostics.
const MAX_ERROR_BODY_BYTES: usize = 4 * 1024;

/// Map a non-success response to `Upstream`, quoting a bounded slice of its body.
pub(crate) async fn check_status(
    response: reqwest::Response,
    provider: &str,
) -> Result<reqwest::Response, QualiaError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_bytes = response.bytes().await.unwrap_or_default();
    let truncated = &error_bytes[..error_bytes.len().min(MAX_ERROR_BODY_BYTES)];
    let text = String::from_utf8_lossy(truncated);
    Err(QualiaError::Upstream {
        provider: provider.to_string(),
        message: format!("{status}: {}", text.trim()),
        status: Some(status.as_u16()),
    })
}

/// reqwest reports the whole-request bound as a generic error; surface it as `Timeout`.
pub(crate) fn request_error(e: reqwest::Error, timeout: Duration) -> QualiaError {
    if e.is_timeout() {
        QualiaError::Timeout(timeout.as_secs())
    } else {
        QualiaError::Request(e)
    }
}
