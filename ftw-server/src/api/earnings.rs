//! Earnings endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ftw_common::db::earnings::{self, EarningsSummary, LoggedEarnings};
use ftw_common::tiers::usd_to_cents;
use serde::Deserialize;
use serde_json::Value;

use super::required;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LogEarningsRequest {
    pub user_id: Option<String>,
    pub source: Option<String>,
    /// USD
    pub amount: Option<f64>,
    pub artifacts: Option<Value>,
}

/// POST /api/log-earnings
pub async fn log_earnings(
    State(state): State<AppState>,
    Json(req): Json<LogEarningsRequest>,
) -> ApiResult<(StatusCode, Json<LoggedEarnings>)> {
    let user_id = required("user_id", req.user_id)?;
    let source = required("source", req.source)?;
    let amount = required("amount", req.amount)?;
    let amount_cents = usd_to_cents(amount)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid amount: {}", amount)))?;

    let logged =
        earnings::log_earnings(&state.db, &user_id, &source, amount_cents, req.artifacts).await?;
    Ok((StatusCode::CREATED, Json(logged)))
}

/// GET /api/earnings/:user_id
pub async fn get_earnings(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<EarningsSummary>> {
    Ok(Json(earnings::earnings_summary(&state.db, &user_id).await?))
}
