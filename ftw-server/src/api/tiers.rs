//! Tier table listing

use axum::{extract::Path, Json};
use ftw_common::tiers::{TierSpec, TierTableId};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct TierTable {
    pub table: TierTableId,
    pub tiers: &'static [TierSpec],
}

fn table(id: TierTableId) -> TierTable {
    TierTable {
        table: id,
        tiers: id.tiers(),
    }
}

/// GET /api/tiers
///
/// Every table as stored; they are not reconciled with each other.
pub async fn list_tier_tables() -> Json<Vec<TierTable>> {
    Json(TierTableId::ALL.into_iter().map(table).collect())
}

/// GET /api/tiers/:table
pub async fn get_tier_table(Path(name): Path<String>) -> ApiResult<Json<TierTable>> {
    TierTableId::parse(&name)
        .map(|id| Json(table(id)))
        .ok_or_else(|| ApiError::NotFound(format!("Unknown tier table: {}", name)))
}
