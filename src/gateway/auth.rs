//! Shared-key authentication for the public endpoints.

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

pub const AUTH_HEADER: &str = "auth";

#[derive(Clone)]
pub struct AuthKey(Arc<str>);

impl AuthKey {
    pub fn new(key: &str) -> Self {
        Self(Arc::from(key))
    }

    fn matches(&self, given: Option<&str>) -> bool {
        given == Some(&*self.0)
    }
}

/// Rejects requests whose `Auth` header does not carry the configured key.
pub async fn require_auth_key(
    State(key): State<AuthKey>,
    request: Request,
    next: Next,
) -> Response {
    let given = request
        .headers()
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok());

    if !key.matches(given) {
        tracing::warn!(
            "Rejected {} {}: missing or wrong auth key",
            request.method(),
            request.uri().path()
        );
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "detail": "Unauthorized" })),
        )
            .into_response();
    }

    next.run(request).await
}
