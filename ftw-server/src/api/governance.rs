//! Governance ledger endpoints

use axum::{extract::State, http::StatusCode, Json};
use ftw_common::ledger::{IntegrityReport, LedgerEntry};
use serde::{Deserialize, Serialize};

use super::required;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InscribeRequest {
    pub action: Option<String>,
    pub actor: Option<String>,
    pub justification: Option<String>,
}

/// POST /api/governance/inscribe (admin)
pub async fn inscribe(
    State(state): State<AppState>,
    Json(req): Json<InscribeRequest>,
) -> ApiResult<(StatusCode, Json<LedgerEntry>)> {
    let action = required("action", req.action)?;
    let actor = required("actor", req.actor)?;
    let justification = req.justification.unwrap_or_default();

    let entry = state.inscribe(&action, &actor, &justification).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub version: u64,
    pub ledger: Vec<LedgerEntry>,
}

/// GET /api/governance/ledger
pub async fn get_ledger(State(state): State<AppState>) -> Json<LedgerResponse> {
    let ledger = state.ledger.lock().await;
    Json(LedgerResponse {
        version: ledger.version(),
        ledger: ledger.entries().to_vec(),
    })
}

/// GET /api/governance/verify
pub async fn verify_ledger(State(state): State<AppState>) -> Json<IntegrityReport> {
    let report = state.ledger.lock().await.verify_integrity();
    if !report.valid {
        tracing::error!(tampered = ?report.tampered, "Governance ledger failed verification");
    }
    Json(report)
}
