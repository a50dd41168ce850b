use super::auth::{AuthKey, require_auth_key};
use super::protocol::*;
use super::service::{Detection, GatewayService};
use crate::dispatch::types::TextQuery;
use crate::error::GatewayError;
use crate::membership::types::WorkerId;

use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use std::sync::Arc;
use tracing::Instrument;

/// Builds the public router. When `auth_key` is set every route requires it.
pub fn router(gateway: Arc<GatewayService>, auth_key: Option<&str>) -> Router {
    let app = Router::new()
        .route(ENDPOINT_DETECT, post(handle_detect))
        .route(ENDPOINT_DETECT_BY_UID, post(handle_detect_by_uid))
        .route(ENDPOINT_ROSTER, get(handle_roster))
        .layer(Extension(gateway));

    match auth_key {
        Some(key) => app.layer(axum::middleware::from_fn_with_state(
            AuthKey::new(key),
            require_auth_key,
        )),
        None => app,
    }
}

pub async fn handle_detect(
    Extension(gateway): Extension<Arc<GatewayService>>,
    Json(req): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, GatewayError> {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("detect", %request_id);

    async move {
        tracing::info!(
            "Incoming request: {} texts, sort={:?} limit={} offset={} timeout={}s",
            req.texts.len(),
            req.sort,
            req.limit,
            req.offset,
            req.timeout
        );

        let criteria = req.criteria();
        let timeout = parse_timeout(req.timeout)?;
        let query = TextQuery { texts: req.texts };

        let detection = gateway.detect(query, criteria, timeout).await?;
        Ok::<_, GatewayError>(Json(into_response(detection)))
    }
    .instrument(span)
    .await
    .inspect_err(|e| tracing::error!("Rejected detect request: {}", e))
}

pub async fn handle_detect_by_uid(
    Extension(gateway): Extension<Arc<GatewayService>>,
    Json(req): Json<DetectByUidRequest>,
) -> Result<Json<DetectResponse>, GatewayError> {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("detect_by_uid", %request_id);

    async move {
        tracing::info!(
            "Incoming direct request: {} texts for {} uids, timeout={}s",
            req.texts.len(),
            req.uids.len(),
            req.timeout
        );

        if req.uids.is_empty() || req.uids.len() > MAX_DIRECT_UIDS {
            return Err(GatewayError::InvalidRequest(format!(
                "Invalid uids count: {}. Must be in range [1; {}]",
                req.uids.len(),
                MAX_DIRECT_UIDS
            )));
        }

        let timeout = parse_timeout(req.timeout)?;
        let ids: Vec<WorkerId> = req.uids.iter().copied().map(WorkerId).collect();
        let query = TextQuery { texts: req.texts };

        let detection = gateway.detect_workers(query, &ids, timeout).await?;
        Ok::<_, GatewayError>(Json(into_response(detection)))
    }
    .instrument(span)
    .await
    .inspect_err(|e| tracing::error!("Rejected direct request: {}", e))
}

pub async fn handle_roster(
    Extension(gateway): Extension<Arc<GatewayService>>,
) -> Json<RosterResponse> {
    let snapshot = gateway.store().snapshot();

    Json(RosterResponse {
        generation: snapshot.generation,
        workers: snapshot.len(),
        serving: snapshot.serving_count(),
    })
}

fn into_response(detection: Detection) -> DetectResponse {
    DetectResponse {
        generation: detection.generation,
        responses: detection.results.into_iter().map(WorkerResponse::from).collect(),
    }
}
