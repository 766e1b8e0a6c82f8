use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;

use crate::dispatch::{TokenResultStream, check_status, request_error};
use crate::error::QualiaError;
use crate::parsers::ChunkParser;
use crate::parsers::ollama::OllamaParser;

const PROVIDER: &str = "ollama";

/// Client for a local Ollama host (`/api/generate`).
#[derive(Clone)]
pub struct OllamaDispatch {
    client: Client,
    host: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

impl OllamaDispatch {
    pub fn new(client: Client, host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            host: host.into(),
            timeout,
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.host.trim_end_matches('/'))
    }

    /// Stream the tokens of one generation. The request is only sent once
    /// the stream is first polled. Ends after the line carrying `done: true`,
    /// or after the first error.
    pub fn stream_generate(&self, model: &str, prompt: String) -> TokenResultStream {
        let client = self.client.clone();
        let url = self.generate_url();
        let timeout = self.timeout;
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": true,
        });
        tracing::debug!("ollama stream request: model={model}");

        Box::pin(async_stream::stream! {
            let sent = client.post(&url).timeout(timeout).json(&body).send().await;
            let response = match sent {
                Ok(r) => r,
                Err(e) => {
                    yield Err(request_error(e, timeout));
                    return;
                }
            };
            let response = match check_status(response, PROVIDER).await {
                Ok(r) => r,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let parser = OllamaParser;
            let mut bytes = std::pin::pin!(response.bytes_stream());
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => buffer.extend_from_slice(&chunk),
                    Err(e) => {
                        yield Err(request_error(e, timeout));
                        return;
                    }
                }

                // Lines may be split across network reads; only complete ones are parsed.
                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = line.trim_ascii();
                    if line.is_empty() {
                        continue;
                    }
                    match parser.parse(line) {
                        Ok(parsed) => {
                            if !parsed.text.is_empty() {
                                yield Ok(parsed.text);
                            }
                            if parsed.done {
                                return;
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            // Connection closed without a trailing newline after the last line.
            let rest = buffer.trim_ascii();
            if !rest.is_empty() {
                match parser.parse(rest) {
                    Ok(parsed) => {
                        if !parsed.text.is_empty() {
                            yield Ok(parsed.text);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                    }
                }
            }
        })
    }

    /// Single non-streaming generation, used for chunk summaries.
    pub async fn generate(&self, model: &str, prompt: &str) -> Result<String, QualiaError> {
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(self.generate_url())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout))?;
        let response = check_status(response, PROVIDER).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| request_error(e, self.timeout))?;
        let parsed: GenerateResponse = serde_json::from_slice(&bytes)
            .map_err(|e| QualiaError::SchemaParse(format!("ollama response parse failed: {e}")))?;

        parsed
            .response
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| QualiaError::Upstream {
                provider: PROVIDER.to_string(),
                message: "empty response".to_string(),
                status: None,
            })
    }
}
