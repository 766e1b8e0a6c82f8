use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::api::enums::Mode;
use crate::dispatch::check_status;
use crate::error::QualiaError;
use crate::orchestrator::AnalysisRequest;

const PROVIDER: &str = "qualia";

/// How successive stream elements combine into the displayed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assembly {
    /// Each element is the whole output so far; keep the latest.
    Snapshot,
    /// Each element is a new piece; concatenate.
    Delta,
}

impl Assembly {
    /// Map-reduce analysis (local) streams snapshots; direct analysis (api) streams deltas.
    pub fn for_analysis(mode: Mode) -> Self {
        match mode {
            Mode::Local => Self::Snapshot,
            Mode::Api => Self::Delta,
        }
    }
}

/// Client-side state of one stream: the text to display after each element.
#[derive(Debug, Clone)]
pub struct Reassembler {
    assembly: Assembly,
    text: String,
}

impl Reassembler {
    pub fn new(assembly: Assembly) -> Self {
        Self {
            assembly,
            text: String::new(),
        }
    }

    /// Fold in one element and return the text to display now.
    pub fn push(&mut self, element: &str) -> &str {
        match self.assembly {
            Assembly::Snapshot => {
                self.text.clear();
                self.text.push_str(element);
            }
            Assembly::Delta => self.text.push_str(element),
        }
        &self.text
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub text: String,
    /// The caller stopped the stream before the server finished it.
    pub cancelled: bool,
}

/// Consumer of the streaming endpoints, for front ends and scripts.
pub struct StreamClient {
    client: Client,
    base_url: String,
}

impl StreamClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Run a long-document analysis, calling `on_update` with the display
    /// text after every element.
    pub async fn analyze(
        &self,
        req: &AnalysisRequest,
        cancel: &CancellationToken,
        on_update: impl FnMut(&str) + Send,
    ) -> Result<StreamOutcome, QualiaError> {
        let fields = [
            ("analysis_type", req.analysis_type.as_str().to_string()),
            ("context", req.context.clone()),
            ("mode", req.mode.as_str().to_string()),
            ("model_choice", req.model_choice.clone()),
        ];
        self.stream_form(
            "/long-document-analysis",
            &fields,
            Assembly::for_analysis(req.mode),
            cancel,
            on_update,
        )
        .await
    }

    /// Ask a question about `context`; tokens are concatenated.
    pub async fn ask(
        &self,
        question: &str,
        context: &str,
        mode: Mode,
        model_choice: &str,
        cancel: &CancellationToken,
        on_update: impl FnMut(&str) + Send,
    ) -> Result<StreamOutcome, QualiaError> {
        let fields = [
            ("question", question.to_string()),
            ("context", context.to_string()),
            ("mode", mode.as_str().to_string()),
            ("model_choice", model_choice.to_string()),
        ];
        self.stream_form("/ask-question", &fields, Assembly::Delta, cancel, on_update)
            .await
    }

    async fn stream_form(
        &self,
        path: &str,
        fields: &[(&str, String)],
        assembly: Assembly,
        cancel: &CancellationToken,
        mut on_update: impl FnMut(&str) + Send,
    ) -> Result<StreamOutcome, QualiaError> {
        let url = format!("{}{path}", self.base_url.trim_end_matches('/'));
        let response = self.client.post(url).form(fields).send().await?;
        let response = check_status(response, PROVIDER).await?;

        let mut reassembler = Reassembler::new(assembly);
        let mut events = std::pin::pin!(response.bytes_stream().eventsource());

        loop {
            tokio::select! {
                // Dropping `events` closes the connection, which stops the server-side pipeline.
                _ = cancel.cancelled() => {
                    tracing::debug!("stream cancelled by caller after {} chars", reassembler.text().len());
                    return Ok(StreamOutcome {
                        text: reassembler.into_text(),
                        cancelled: true,
                    });
                }
                event = events.next() => match event {
                    Some(Ok(event)) => on_update(reassembler.push(&event.data)),
                    Some(Err(e)) => {
                        return Err(QualiaError::Upstream {
                            provider: PROVIDER.to_string(),
                            message: format!("event stream error: {e}"),
                            status: None,
                        });
                    }
                    None => break,
                }
            }
        }

        Ok(StreamOutcome {
            text: reassembler.into_text(),
            cancelled: false,
        })
    }
}
