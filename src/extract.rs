use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::config::Config;
use crate::dispatch::{check_status, request_error};
use crate::error::QualiaError;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac", "ogg"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "docx", "xlsx", "xls"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "csv"];

/// How an uploaded file becomes text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Decoded in-process.
    Text,
    /// Sent to the transcription service.
    Audio,
    /// Sent to the document-extraction service.
    Document,
}

impl SourceKind {
    /// Classify by file extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Result<Self, QualiaError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Text)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Audio)
        } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Document)
        } else {
            Err(QualiaError::UnsupportedFormat(filename.to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub is_audio: bool,
}

#[derive(Deserialize)]
struct TextBody {
    text: Option<String>,
}

/// Turns uploads into analysis context, delegating binary formats to
/// external collaborators.
pub struct Extractor {
    client: Client,
    transcriber_url: Option<String>,
    extractor_url: Option<String>,
    timeout: Duration,
}

impl Extractor {
    pub fn new(
        client: Client,
        transcriber_url: Option<String>,
        extractor_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            transcriber_url,
            extractor_url,
            timeout,
        }
    }

    pub fn from_config(config: &Config, client: Client) -> Self {
        Self::new(
            client,
            config.transcriber_url.clone(),
            config.extractor_url.clone(),
            config.request_timeout,
        )
    }

    /// Extract the full text of an upload. `language` is a transcription hint
    /// (`auto`, `fr`, `en`, ...) ignored for non-audio files.
    pub async fn extract(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        language: &str,
    ) -> Result<Extraction, QualiaError> {
        let kind = SourceKind::from_filename(filename)?;
        tracing::info!("extract: {filename} ({} bytes) as {kind:?}", bytes.len());

        let text = match kind {
            SourceKind::Text => decode_text(&bytes),
            SourceKind::Audio => {
                let url = self
                    .transcriber_url
                    .as_deref()
                    .ok_or_else(|| QualiaError::NotConfigured {
                        provider: "transcription".to_string(),
                    })?;
                self.transcribe(url, filename, bytes, language).await?
            }
            SourceKind::Document => {
                let url = self
                    .extractor_url
                    .as_deref()
                    .ok_or_else(|| QualiaError::NotConfigured {
                        provider: "document extraction".to_string(),
                    })?;
                self.extract_document(url, filename, bytes).await?
            }
        };

        if text.trim().is_empty() {
            return Err(QualiaError::EmptyExtraction(filename.to_string()));
        }

        Ok(Extraction {
            text,
            is_audio: kind == SourceKind::Audio,
        })
    }

    async fn transcribe(
        &self,
        base_url: &str,
        filename: &str,
        bytes: Vec<u8>,
        language: &str,
    ) -> Result<String, QualiaError> {
        let url = format!("{}/v1/audio/transcriptions", base_url.trim_end_matches('/'));
        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(filename.to_string()))
            .text("response_format", "json");
        let language = language.trim();
        if !language.is_empty() && language != "auto" {
            form = form.text("language", language.to_string());
        }
        self.post_form(&url, form, "transcription").await
    }

    async fn extract_document(
        &self,
        base_url: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, QualiaError> {
        let url = format!("{}/extract", base_url.trim_end_matches('/'));
        let form = Form::new().part("file", Part::bytes(bytes).file_name(filename.to_string()));
        self.post_form(&url, form, "document extraction").await
    }

    async fn post_form(&self, url: &str, form: Form, provider: &str) -> Result<String, QualiaError> {
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout))?;
        let response = check_status(response, provider).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| request_error(e, self.timeout))?;
        let body: TextBody = serde_json::from_slice(&bytes)
            .map_err(|e| QualiaError::SchemaParse(format!("{provider} response: {e}")))?;
        Ok(body.text.unwrap_or_default())
    }
}

/// UTF-8 decode, replacing invalid sequences and dropping a leading BOM.
pub fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}
