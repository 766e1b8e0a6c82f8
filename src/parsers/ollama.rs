use serde::Deserialize;

use crate::error::QualiaError;
use crate::parsers::{ChunkParser, StreamChunk};

/// Parses one line of Ollama's `/api/generate` NDJSON stream.
/// Expected shape: `{"model": "...", "response": "tok", "done": false}`
pub struct OllamaParser;

#[derive(Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

impl ChunkParser for OllamaParser {
    fn parse(&self, payload: &[u8]) -> Result<StreamChunk, QualiaError> {
        let line: GenerateLine = serde_json::from_slice(payload)
            .map_err(|e| QualiaError::SchemaParse(format!("ollama line parse failed: {e}")))?;

        // Ollama reports mid-stream failures (e.g. model not found) in-band.
        if let Some(message) = line.error {
            return Err(QualiaError::Upstream {
                provider: "ollama".to_string(),
                message,
                status: None,
            });
        }

        Ok(StreamChunk {
            text: line.response,
            done: line.done,
        })
    }
}
