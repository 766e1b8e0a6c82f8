use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::QualiaError;

/// Error and status body shared by every JSON endpoint: `{"message": "..."}`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub message: String,
    pub full_text: String,
    pub is_audio: bool,
}

impl UploadResponse {
    pub fn processed(full_text: String, is_audio: bool) -> Self {
        Self {
            message: "Fichier traité.".to_string(),
            full_text,
            is_audio,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Handler error. Caller mistakes map to 400, everything else to 500; the
/// body carries the sanitized message only.
#[derive(Debug)]
pub struct ApiError(pub QualiaError);

impl From<QualiaError> for ApiError {
    fn from(err: QualiaError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::BAD_REQUEST {
            self.0.user_message()
        } else {
            tracing::error!(
                "request failed (provider={}): {}",
                self.0.provider().unwrap_or("none"),
                self.0
            );
            format!("Erreur: {}", self.0.user_message())
        };
        (status, Json(MessageResponse { message })).into_response()
    }
}
