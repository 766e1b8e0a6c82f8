use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use futures_util::{Stream, StreamExt};
use tokio::net::TcpListener;

use crate::api::forms::{AnalysisForm, AskForm, SummarizeForm};
use crate::api::models::ModelsResponse;
use crate::config::Config;
use crate::dispatch::gateway::{Gateway, build_client};
use crate::dispatch::{Generate, TextStream};
use crate::error::QualiaError;
use crate::extract::Extractor;
use crate::orchestrator::Orchestrator;
use crate::response::{ApiError, HealthResponse, SummaryResponse, UploadResponse};
use crate::summarize::{Summarize, summarizer_from_config};

/// Audio interviews run large; long contexts arrive as form bodies too.
pub const MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Process-scoped services shared read-only by every request.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Orchestrator,
    gateway: Arc<dyn Generate>,
    summarizer: Arc<dyn Summarize>,
    extractor: Arc<Extractor>,
    models: Arc<ModelsResponse>,
}

impl AppState {
    pub fn new(
        orchestrator: Orchestrator,
        gateway: Arc<dyn Generate>,
        summarizer: Arc<dyn Summarize>,
        extractor: Arc<Extractor>,
        models: ModelsResponse,
    ) -> Self {
        Self {
            orchestrator,
            gateway,
            summarizer,
            extractor,
            models: Arc::new(models),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, QualiaError> {
        let client = build_client()?;
        let gateway: Arc<dyn Generate> = Arc::new(Gateway::from_config(config, client.clone()));
        let summarizer = summarizer_from_config(config, client.clone());
        let extractor = Arc::new(Extractor::from_config(config, client));
        let orchestrator = Orchestrator::new(
            gateway.clone(),
            summarizer.clone(),
            Arc::new(config.prompts.clone()),
            config.chunking,
        );
        Ok(Self::new(
            orchestrator,
            gateway,
            summarizer,
            extractor,
            ModelsResponse::from(config),
        ))
    }
}

pub fn router(state: AppState) -> Router {
    // Trailing-slash variants keep existing front ends working.
    Router::new()
        .route("/health", get(health))
        .route("/models", get(models))
        .route("/upload-file", post(upload_file))
        .route("/upload-file/", post(upload_file))
        .route("/long-document-analysis", post(long_document_analysis))
        .route("/long-document-analysis/", post(long_document_analysis))
        .route("/ask-question", post(ask_question))
        .route("/ask-question/", post(ask_question))
        .route("/summarize-context", post(summarize_context))
        .route("/summarize-context/", post(summarize_context))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Serve until `shutdown` resolves. In-flight streams are dropped with their connections.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// One SSE event per stream element, flushed as soon as it is produced.
/// The stream is only polled as fast as the client reads; a disconnect drops it.
fn event_stream(stream: TextStream) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(stream.map(|text| Ok(Event::default().data(strip_carriage_returns(text)))))
        .keep_alive(KeepAlive::default())
}

/// SSE field values cannot carry carriage returns. Dropping them keeps the
/// result independent of how a `\r\n` pair is split across elements.
fn strip_carriage_returns(text: String) -> String {
    if text.contains('\r') {
        text.replace('\r', "")
    } else {
        text
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

async fn models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(state.models.as_ref().clone())
}

async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut language = "auto".to_string();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((filename, bytes.to_vec()));
            }
            "language" => {
                language = field.text().await.map_err(multipart_error)?;
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| {
        QualiaError::InvalidInput("Veuillez sélectionner un fichier.".to_string())
    })?;
    let extraction = state.extractor.extract(&filename, bytes, &language).await?;
    Ok(Json(UploadResponse::processed(
        extraction.text,
        extraction.is_audio,
    )))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError(QualiaError::InvalidInput(format!("requête multipart invalide: {e}")))
}

/// Malformed form fields get the same `{message}` body as every other rejection.
fn form_error(rejection: FormRejection) -> ApiError {
    ApiError(QualiaError::InvalidInput(format!(
        "formulaire invalide: {}",
        rejection.body_text()
    )))
}

async fn long_document_analysis(
    State(state): State<AppState>,
    form: Result<Form<AnalysisForm>, FormRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Form(form) = form.map_err(form_error)?;
    Ok(event_stream(state.orchestrator.analyze(form.into())))
}

async fn ask_question(
    State(state): State<AppState>,
    form: Result<Form<AskForm>, FormRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Form(form) = form.map_err(form_error)?;
    form.validate()?;
    tracing::info!("ask-question: mode={} model={}", form.mode, form.model_choice);
    Ok(event_stream(state.gateway.ask(form.into())))
}

async fn summarize_context(
    State(state): State<AppState>,
    form: Result<Form<SummarizeForm>, FormRejection>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let Form(form) = form.map_err(form_error)?;
    form.validate()?;
    let summary = state
        .summarizer
        .summarize(&form.context, form.min_length, form.max_length)
        .await?;
    Ok(Json(SummaryResponse { summary }))
}
