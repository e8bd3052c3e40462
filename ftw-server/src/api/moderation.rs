//! Ban proposals, verdicts and appeals

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use ftw_common::db::{moderation, Appeal, AppealStatus, BanProposal};
use serde::{Deserialize, Serialize};

use super::required;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BanProposalRequest {
    pub user_id: Option<String>,
    pub reason: Option<String>,
    pub proposed_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub status: &'static str,
    pub id: String,
}

/// POST /api/ban-proposals
pub async fn create_ban_proposal(
    State(state): State<AppState>,
    Json(req): Json<BanProposalRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let user_id = required("user_id", req.user_id)?;
    let reason = required("reason", req.reason)?;

    let proposal =
        moderation::create_ban_proposal(&state.db, &user_id, &reason, req.proposed_by.as_deref())
            .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            status: "proposed",
            id: proposal.id,
        }),
    ))
}

/// GET /api/ban-proposals
pub async fn list_ban_proposals(State(state): State<AppState>) -> ApiResult<Json<Vec<BanProposal>>> {
    Ok(Json(moderation::list_ban_proposals(&state.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct VerdictRequest {
    pub ban_id: Option<String>,
    pub appeal_id: Option<String>,
    pub verdict: Option<String>,
    pub reviewed_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BanVerdictResponse {
    pub status: &'static str,
    pub proposal: BanProposal,
    pub ledger_version: u64,
}

/// POST /api/ban-verdict (admin)
///
/// Of two verdicts racing on one proposal, the loser gets 409. The verdict
/// and its governance entry land together or not at all.
pub async fn ban_verdict(
    State(state): State<AppState>,
    Json(req): Json<VerdictRequest>,
) -> ApiResult<Json<BanVerdictResponse>> {
    let ban_id = required("ban_id", req.ban_id)?;
    let verdict = required("verdict", req.verdict)?;
    let reviewer = moderation::reviewer_or_default(req.reviewed_by.as_deref()).to_string();

    let pending = moderation::get_ban_proposal(&state.db, &ban_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Ban proposal not found: {}", ban_id)))?;
    let justification = format!("ban {} on user {}: {}", pending.id, pending.user_id, verdict);

    let (proposal, entry) = state
        .inscribe_with(
            "ban_verdict",
            &reviewer,
            &justification,
            || moderation::record_ban_verdict(&state.db, &ban_id, &verdict, Some(&reviewer)),
            || moderation::revert_ban_verdict(&state.db, &ban_id),
        )
        .await?;

    Ok(Json(BanVerdictResponse {
        status: "reviewed",
        proposal,
        ledger_version: entry.version,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AppealRequest {
    pub user_id: Option<String>,
    pub reason: Option<String>,
}

/// POST /api/appeals
pub async fn submit_appeal(
    State(state): State<AppState>,
    Json(req): Json<AppealRequest>,
) -> ApiResult<(StatusCode, Json<Appeal>)> {
    let user_id = required("user_id", req.user_id)?;
    let reason = required("reason", req.reason)?;

    let appeal = moderation::submit_appeal(&state.db, &user_id, &reason).await?;
    Ok((StatusCode::CREATED, Json(appeal)))
}

#[derive(Debug, Deserialize)]
pub struct AppealListQuery {
    pub status: Option<String>,
}

/// GET /api/appeals?status=
pub async fn list_appeals(
    State(state): State<AppState>,
    Query(query): Query<AppealListQuery>,
) -> ApiResult<Json<Vec<Appeal>>> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            AppealStatus::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown appeal status: {}", raw)))?,
        ),
    };

    Ok(Json(moderation::list_appeals(&state.db, status).await?))
}

#[derive(Debug, Serialize)]
pub struct AppealVerdictResponse {
    pub status: &'static str,
    pub appeal: Appeal,
    pub ledger_version: u64,
}

/// POST /api/appeals/verdict (admin)
pub async fn appeal_verdict(
    State(state): State<AppState>,
    Json(req): Json<VerdictRequest>,
) -> ApiResult<Json<AppealVerdictResponse>> {
    let appeal_id = required("appeal_id", req.appeal_id)?;
    let verdict = required("verdict", req.verdict)?;
    let reviewer = moderation::reviewer_or_default(req.reviewed_by.as_deref()).to_string();

    let pending = moderation::get_appeal(&state.db, &appeal_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Appeal not found: {}", appeal_id)))?;
    let justification = format!("appeal {} by user {}: {}", pending.id, pending.user_id, verdict);

    let (appeal, entry) = state
        .inscribe_with(
            "appeal_verdict",
            &reviewer,
            &justification,
            || moderation::record_appeal_verdict(&state.db, &appeal_id, &verdict, Some(&reviewer)),
            || moderation::revert_appeal_verdict(&state.db, &appeal_id),
        )
        .await?;

    Ok(Json(AppealVerdictResponse {
        status: "reviewed",
        appeal,
        ledger_version: entry.version,
    }))
}
