//! Long-document analysis pipeline.
//!
//! Local mode runs map-reduce: the context is chunked, each chunk summarized
//! in order, and the partial summaries folded into one synthesis call. Every
//! element it emits is the whole progress log so far (snapshot streaming).
//! API mode sends the unchunked context in one call and passes the model's
//! tokens through untouched (delta streaming). Clients rely on that
//! difference, so the two paths keep their own framing.

use std::sync::Arc;

use futures_util::StreamExt;

use crate::api::enums::{AnalysisType, Mode};
use crate::chunker::ChunkParams;
use crate::dispatch::{AskRequest, Generate, TextStream};
use crate::error::QualiaError;
use crate::prompts::PromptRegistry;
use crate::summarize::{CHUNK_MAX_LENGTH, CHUNK_MIN_LENGTH, Summarize};

/// Sole element emitted for an empty context.
pub const EMPTY_CONTEXT_MESSAGE: &str = "ERREUR : Le contexte est vide.";

/// Joins partial summaries into the reduce-stage input.
pub const SUMMARY_SEPARATOR: &str = "\n\n---\n\n";

const LOCAL_BANNER: &str = "Mode Local sélectionné. Lancement du processus Map-Reduce...\n";
const API_BANNER: &str = "Mode API sélectionné. Envoi du document complet...\n\n";
const FINAL_HEADER: &str = "\n\n----------------------------------\nÉtape 3/3 : Synthèse finale...\n----------------------------------\n\n";

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub analysis_type: AnalysisType,
    pub context: String,
    pub mode: Mode,
    pub model_choice: String,
}

/// Partial summary standing in for a chunk whose summarization failed.
pub fn error_marker(err: &QualiaError) -> String {
    format!("Erreur d'analyse: {}", err.user_message())
}

pub fn combine_summaries(partials: &[String]) -> String {
    partials.join(SUMMARY_SEPARATOR)
}

/// Drives one analysis request. Holds only shared read-only services, so a
/// single instance serves every request concurrently.
#[derive(Clone)]
pub struct Orchestrator {
    gateway: Arc<dyn Generate>,
    summarizer: Arc<dyn Summarize>,
    prompts: Arc<PromptRegistry>,
    chunking: ChunkParams,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn Generate>,
        summarizer: Arc<dyn Summarize>,
        prompts: Arc<PromptRegistry>,
        chunking: ChunkParams,
    ) -> Self {
        Self {
            gateway,
            summarizer,
            prompts,
            chunking,
        }
    }

    pub fn chunking(&self) -> ChunkParams {
        self.chunking
    }

    /// Pick the pipeline for the request's mode.
    pub fn analyze(&self, req: AnalysisRequest) -> TextStream {
        tracing::info!(
            "analysis: type={} mode={} model={} context_chars={}",
            req.analysis_type,
            req.mode,
            req.model_choice,
            req.context.chars().count()
        );
        match req.mode {
            Mode::Local => self.map_reduce(req),
            Mode::Api => self.direct(req),
        }
    }

    /// Chunk, summarize each chunk, then stream one synthesis over the
    /// combined summaries. A failed chunk contributes an inline error marker
    /// and the pipeline carries on.
    pub fn map_reduce(&self, req: AnalysisRequest) -> TextStream {
        let this = self.clone();

        Box::pin(async_stream::stream! {
            if req.context.trim().is_empty() {
                yield EMPTY_CONTEXT_MESSAGE.to_string();
                return;
            }

            let mut log = String::from(LOCAL_BANNER);
            yield log.clone();

            log.push_str("Étape 1/3 : Découpage du document...\n");
            yield log.clone();

            let chunks = this.chunking.split(&req.context);
            let total = chunks.len();
            tracing::debug!("map-reduce: {total} chunks");
            log.push_str(&format!("Document découpé en {total} morceaux.\n\n"));
            yield log.clone();

            log.push_str("Étape 2/3 : Création des résumés partiels...\n");
            yield log.clone();

            // One entry per chunk, success or not.
            let mut partials: Vec<String> = Vec::with_capacity(total);
            for (i, chunk) in chunks.iter().enumerate() {
                let n = i + 1;
                log.push_str(&format!("  - Traitement du morceau {n}/{total}...\n"));
                yield log.clone();

                match this
                    .summarizer
                    .summarize(chunk, CHUNK_MIN_LENGTH, CHUNK_MAX_LENGTH)
                    .await
                {
                    Ok(summary) => {
                        partials.push(summary);
                        log.push_str("    -> Terminé.\n");
                    }
                    Err(e) => {
                        tracing::warn!("chunk {n}/{total} summarization failed: {e}");
                        partials.push(error_marker(&e));
                        log.push_str(&format!("    -> Erreur sur le morceau {n}.\n"));
                    }
                }
                yield log.clone();
            }

            log.push_str(FINAL_HEADER);
            yield log.clone();

            let combined = combine_summaries(&partials);
            let prompt = this.prompts.render_for(req.analysis_type, &combined);
            let mut tokens = this
                .gateway
                .ask(AskRequest::full_prompt(prompt, req.mode, req.model_choice));
            while let Some(token) = tokens.next().await {
                log.push_str(&token);
                yield log.clone();
            }
        })
    }

    /// Render the template over the raw context and pass tokens straight through.
    pub fn direct(&self, req: AnalysisRequest) -> TextStream {
        let this = self.clone();

        Box::pin(async_stream::stream! {
            if req.context.trim().is_empty() {
                yield EMPTY_CONTEXT_MESSAGE.to_string();
                return;
            }

            yield API_BANNER.to_string();

            let prompt = this.prompts.render_for(req.analysis_type, &req.context);
            let mut tokens = this
                .gateway
                .ask(AskRequest::full_prompt(prompt, req.mode, req.model_choice));
            while let Some(token) = tokens.next().await {
                yield token;
            }
        })
    }
}
