//! Users and tier upgrades

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ftw_common::db::{users, User};
use ftw_common::ledger::NotaryEvent;
use ftw_common::tiers::usd_to_cents;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::required;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub id: Option<String>,
    pub tier: Option<String>,
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = users::create_user(&state.db, req.id, req.tier.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    users::get_user(&state.db, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("User not found: {}", id)))
}

#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    pub user_id: Option<String>,
    pub new_tier: Option<String>,
    /// USD, cents precision
    pub payment_amount: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct UpgradeResponse {
    pub status: &'static str,
    pub user_id: String,
    pub from_tier: String,
    pub new_tier: String,
    pub profit_retention: f64,
}

/// POST /api/upgrade-tier
pub async fn upgrade_tier(
    State(state): State<AppState>,
    Json(req): Json<UpgradeRequest>,
) -> ApiResult<Json<UpgradeResponse>> {
    let user_id = required("user_id", req.user_id)?;
    let new_tier = required("new_tier", req.new_tier)?;
    let amount = required("payment_amount", req.payment_amount)?;
    let payment_cents = usd_to_cents(amount)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid payment_amount: {}", amount)))?;

    let outcome = users::upgrade_tier(&state.db, &user_id, &new_tier, payment_cents).await?;

    state
        .notarize(
            NotaryEvent::new("tier_upgrade")
                .actor(&outcome.user_id)
                .key(format!("users/{}/tier", outcome.user_id))
                .value(json!(outcome.new_tier))
                .old_value(json!(outcome.from_tier)),
        )
        .await;

    info!(
        user_id = %outcome.user_id,
        payment_cents,
        "Upgrade to {} accepted",
        outcome.new_tier
    );

    Ok(Json(UpgradeResponse {
        status: "upgraded",
        user_id: outcome.user_id,
        from_tier: outcome.from_tier,
        new_tier: outcome.new_tier,
        profit_retention: outcome.profit_retention,
    }))
}
