//! Scheduled drops and the vault

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use ftw_common::db::{drops, VaultArtifact};
use ftw_common::time;
use ftw_common::vault::TierFilter;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::required;
use crate::error::{ApiError, ApiResult};
use crate::{scheduler, AppState};

#[derive(Debug, Deserialize)]
pub struct ScheduleDropRequest {
    pub title: Option<String>,
    pub tier: Option<String>,
    /// RFC 3339
    pub unlock_at: Option<String>,
    pub content: Option<Value>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleDropResponse {
    pub status: &'static str,
    pub id: String,
    pub title: String,
    pub unlock_at: String,
}

/// POST /api/schedule-drop
pub async fn schedule_drop(
    State(state): State<AppState>,
    Json(req): Json<ScheduleDropRequest>,
) -> ApiResult<(StatusCode, Json<ScheduleDropResponse>)> {
    let title = required("title", req.title)?;
    let tier = required("tier", req.tier)?;
    let unlock_at = required("unlock_at", req.unlock_at)?;
    let content = req
        .content
        .filter(|c| !c.is_null())
        .ok_or_else(|| ApiError::BadRequest("Missing required field: content".into()))?;

    let drop = drops::schedule_drop(
        &state.db,
        drops::NewDrop {
            title,
            tier_gate: tier,
            unlock_at: time::parse_rfc3339(&unlock_at)?,
            content,
            user_id: req.user_id,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ScheduleDropResponse {
            status: "dropScheduled",
            id: drop.id,
            title: drop.title,
            unlock_at: drop.unlock_at,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct SchedulerRunResponse {
    pub executed: usize,
}

/// POST /api/run-drop-scheduler (admin)
pub async fn run_drop_scheduler(
    State(state): State<AppState>,
) -> ApiResult<Json<SchedulerRunResponse>> {
    let executed = scheduler::run_once(&state).await?;
    Ok(Json(SchedulerRunResponse { executed }))
}

#[derive(Debug, Deserialize)]
pub struct VaultQuery {
    pub user_id: Option<String>,
    pub tier: Option<String>,
}

/// GET /api/vault?user_id=&tier=
pub async fn get_vault(
    State(state): State<AppState>,
    Query(query): Query<VaultQuery>,
) -> ApiResult<Json<Vec<VaultArtifact>>> {
    let user_id = required("user_id", query.user_id)?;
    let tier = required("tier", query.tier)?;

    let artifacts = drops::list_vault(&state.db, &user_id, &TierFilter::parse(&tier)).await?;
    Ok(Json(artifacts))
}
