pub mod gemini;
pub mod ollama;

use crate::error::QualiaError;

/// One decoded unit of a streaming generation response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    pub text: String,
    /// The provider signalled the end of generation.
    pub done: bool,
}

/// Trait for decoding one framed payload (an NDJSON line, an SSE `data`
/// field) of a provider's token stream. Each provider has its own shape.
pub trait ChunkParser: Send + Sync {
    fn parse(&self, payload: &[u8]) -> Result<StreamChunk, QualiaError>;
}
