use serde::Deserialize;

use crate::error::QualiaError;
use crate::parsers::{ChunkParser, StreamChunk};

/// Parses the `data` field of one Gemini `streamGenerateContent?alt=sse` event.
/// Expected shape: `{"candidates": [{"content": {"parts": [{"text": "..."}]}, "finishReason": "STOP"}]}`
pub struct GeminiParser;

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    code: Option<u16>,
    message: Option<String>,
}

impl ChunkParser for GeminiParser {
    fn parse(&self, payload: &[u8]) -> Result<StreamChunk, QualiaError> {
        let response: GenerateResponse = serde_json::from_slice(payload)
            .map_err(|e| QualiaError::SchemaParse(format!("gemini event parse failed: {e}")))?;

        if let Some(err) = response.error {
            return Err(QualiaError::Upstream {
                provider: "gemini".to_string(),
                message: err.message.unwrap_or_else(|| "unknown error".to_string()),
                status: err.code,
            });
        }

        // Only the first candidate is ever requested. Parts without text
        // (e.g. safety metadata) contribute nothing.
        let Some(candidate) = response.candidates.into_iter().next() else {
            return Ok(StreamChunk::default());
        };
        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(StreamChunk {
            text,
            done: candidate.finish_reason.is_some(),
        })
    }
}
