use std::time::Duration;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;

use crate::config::GeminiConfig;
use crate::dispatch::{TokenResultStream, check_status, request_error};
use crate::error::QualiaError;
use crate::parsers::ChunkParser;
use crate::parsers::gemini::GeminiParser;

const PROVIDER: &str = "gemini";

/// Client for the hosted Gemini `streamGenerateContent` endpoint (SSE).
#[derive(Clone)]
pub struct GeminiDispatch {
    client: Client,
    config: GeminiConfig,
    timeout: Duration,
}

impl GeminiDispatch {
    pub fn new(client: Client, config: GeminiConfig, timeout: Duration) -> Self {
        Self {
            client,
            config,
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Stream the text parts of one generation. Lazy: nothing is sent until polled.
    pub fn stream_generate(&self, prompt: String) -> TokenResultStream {
        let client = self.client.clone();
        let url = self.stream_url();
        let api_key = self.config.api_key.clone();
        let timeout = self.timeout;
        let body = serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}]
        });
        tracing::debug!("gemini stream request: model={}", self.config.model);

        Box::pin(async_stream::stream! {
            let sent = client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .header("Content-Type", "application/json")
                .timeout(timeout)
                .json(&body)
                .send()
                .await;
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

            let parser = GeminiParser;
            let mut events = std::pin::pin!(response.bytes_stream().eventsource());
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        yield Err(QualiaError::Upstream {
                            provider: PROVIDER.to_string(),
                            message: format!("event stream error: {e}"),
                            status: None,
                        });
                        return;
                    }
                };
                if event.data.trim().is_empty() {
                    continue;
                }
                match parser.parse(event.data.as_bytes()) {
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
        })
    }
}
