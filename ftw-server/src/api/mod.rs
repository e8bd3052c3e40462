//! HTTP API handlers for ftw-server

pub mod auth;
pub mod earnings;
pub mod governance;
pub mod health;
pub mod moderation;
pub mod notary;
pub mod payments;
pub mod tiers;
pub mod users;
pub mod vault;

pub use auth::auth_middleware;
pub use earnings::{get_earnings, log_earnings};
pub use governance::{get_ledger, inscribe, verify_ledger};
pub use health::health_routes;
pub use moderation::{
    appeal_verdict, ban_verdict, create_ban_proposal, list_appeals, list_ban_proposals,
    submit_appeal,
};
pub use notary::{clear_notary, notary_stats, query_notary, record_notary};
pub use payments::{detect_content, get_payout_method, route_payment, set_payout_method};
pub use tiers::{get_tier_table, list_tier_tables};
pub use users::{create_user, get_user, upgrade_tier};
pub use vault::{get_vault, run_drop_scheduler, schedule_drop};

use crate::error::{ApiError, ApiResult};

/// Unwrap a required request field; blank strings count as missing
pub(crate) fn required<T: RequiredField>(field: &str, value: Option<T>) -> ApiResult<T> {
    match value {
        Some(v) if !v.is_blank() => Ok(v),
        _ => Err(ApiError::BadRequest(format!(
            "Missing required field: {}",
            field
        ))),
    }
}

pub(crate) trait RequiredField {
    fn is_blank(&self) -> bool;
}

impl RequiredField for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl RequiredField for f64 {
    fn is_blank(&self) -> bool {
        false
    }
}
