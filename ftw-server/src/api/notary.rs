//! Event notary endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use ftw_common::ledger::{NotaryEntry, NotaryEvent, NotaryFilter, NotaryStats};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/notary (admin)
///
/// The signing fields are not part of the event and are ignored.
pub async fn record_notary(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<NotaryEntry>)> {
    let event: NotaryEvent = serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid notary event: {}", e)))?;
    if event.command.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing required field: command".into()));
    }

    let entry = state.notarize(event).await;
    info!(id = entry.id, command = %entry.command, actor = %entry.actor, "Notarized event");
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/notary?actor=&command=&key=&limit=
pub async fn query_notary(
    State(state): State<AppState>,
    Query(filter): Query<NotaryFilter>,
) -> Json<Vec<NotaryEntry>> {
    Json(state.notary.read().await.query(&filter))
}

/// GET /api/notary/stats
pub async fn notary_stats(State(state): State<AppState>) -> Json<NotaryStats> {
    Json(state.notary.read().await.stats())
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

/// DELETE /api/notary (admin)
pub async fn clear_notary(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared = state.notary.write().await.clear();
    warn!(cleared, "Event notary cleared");
    Json(ClearResponse { cleared })
}
