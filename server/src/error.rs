use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use voice_transcribe_common::api::ErrorResponse;

use crate::payload::PayloadError;

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client sent something unusable. The message is shown to it as-is.
    #[error("{0}")]
    BadRequest(String),

    /// The body could not be read at all (e.g. over the size limit).
    #[error("{detail}")]
    Rejected { status: StatusCode, detail: String },

    /// Anything else. Details are logged, never returned.
    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PayloadError> for ApiError {
    fn from(err: PayloadError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Keep the transport status, 413 for an oversized body
            JsonRejection::BytesRejection(_) => Self::Rejected {
                status: rejection.status(),
                detail: rejection.body_text(),
            },
            _ => Self::BadRequest(rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Self::BadRequest(detail) | Self::Rejected { detail, .. } => {
                tracing::debug!(status = %status, detail = %detail, "Rejected request")
            }
            Self::Internal(err) => tracing::error!(error = format!("{err:#}"), "Request failed"),
        }

        let body = ErrorResponse {
            detail: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
