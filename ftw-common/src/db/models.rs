//! Database record types
//!
//! Timestamps are kept in their stored RFC 3339 form; JSON columns decode
//! through [`sqlx::types::Json`] and serialize transparently.

use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub tier: String,
    pub profit_retention: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Row of the upgrade ledger
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TierUpgrade {
    pub id: String,
    pub user_id: String,
    pub from_tier: String,
    pub to_tier: String,
    pub cost_cents: i64,
    pub profit_retention: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct BanProposal {
    pub id: String,
    pub user_id: String,
    pub reason: String,
    pub proposed_by: Option<String>,
    pub verdict: Option<String>,
    pub reviewed: bool,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Appeal {
    pub id: String,
    pub user_id: String,
    pub reason: String,
    pub status: String,
    pub verdict: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
}

/// Appeal lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppealStatus {
    Pending,
    Reviewed,
}

impl AppealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppealStatus::Pending => "pending",
            AppealStatus::Reviewed => "reviewed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppealStatus::Pending),
            "reviewed" => Some(AppealStatus::Reviewed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ScheduledDrop {
    pub id: String,
    pub title: String,
    pub tier_gate: String,
    pub unlock_at: String,
    pub content: Json<Value>,
    pub user_id: Option<String>,
    pub status: String,
    pub created_at: String,
}

/// Vault artifact
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct VaultArtifact {
    pub id: String,
    pub drop_id: Option<String>,
    pub user_id: Option<String>,
    pub title: String,
    pub content: Json<Value>,
    pub sealed: bool,
    pub tier_gate: Option<String>,
    pub unlock_at: Option<String>,
    pub unlocked_at: Option<String>,
    pub ritual_tag: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Payout {
    pub id: String,
    pub user_id: String,
    pub source: String,
    pub amount_cents: i64,
    pub artifacts: Option<Json<Value>>,
    pub created_at: String,
}

/// Earnings split recorded alongside a payout
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CreatorEarning {
    pub id: String,
    pub payout_id: String,
    pub user_id: String,
    pub source: String,
    pub amount_cents: i64,
    pub tier: String,
    pub profit_retention: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CreatorProfile {
    pub creator_id: String,
    pub payment_type: Option<String>,
    pub content_rating: String,
    pub forced_crypto_only: bool,
    pub crypto_wallet_address: Option<String>,
    pub stripe_connect_account_id: Option<String>,
    pub payment_setup_complete: bool,
    pub updated_at: String,
}

/// Persisted payment routing receipt
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PaymentDecision {
    pub id: String,
    pub content_url: String,
    pub amount_cents: i64,
    pub creator_id: String,
    pub adult: Option<String>,
    pub racy: Option<String>,
    pub violence: Option<String>,
    pub decision: String,
    pub reason: String,
    pub error: Option<String>,
    pub created_at: String,
}
