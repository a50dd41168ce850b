//! Request-level error types.

use crate::dispatch::dispatcher::DispatchError;
use crate::selection::types::CriteriaError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors that fail a whole request before any worker is contacted.
///
/// Per-worker failures never end up here; they are recorded in the worker's
/// slot of the dispatch result.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    InvalidCriteria(#[from] CriteriaError),

    #[error("Unknown worker uid: {0}")]
    UnknownWorker(u16),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl GatewayError {
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) | Self::InvalidCriteria(_) => "invalid_request",
            Self::UnknownWorker(_) => "unknown_worker",
            Self::Dispatch(_) => "invalid_timeout",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidCriteria(_)
            | Self::UnknownWorker(_)
            | Self::Dispatch(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.to_string(),
            "type": self.error_type(),
        });

        (self.status_code(), Json(body)).into_response()
    }
}
