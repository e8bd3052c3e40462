//! Payouts and creator earnings

use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::info;

use super::init::MAX_LOCK_WAIT_MS;
use super::models::CreatorEarning;
use super::retry_on_lock;
use crate::tiers::earnings_retention;
use crate::{time, uuid_utils, Error, Result};

/// Tier stamped on earnings for users with no record
pub const UNKNOWN_TIER: &str = "Unknown";

/// Ids and split recorded by [`log_earnings`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedEarnings {
    pub payout_id: String,
    pub earning_id: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub tier: String,
    pub profit_retention: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarningsSummary {
    pub user_id: String,
    pub gross_cents: i64,
    pub profit_retention: f64,
    pub net_cents: i64,
}

/// Record a payout and its earnings split in one transaction
///
/// The split uses the founder-ladder retention for the user's stored tier.
pub async fn log_earnings(
    pool: &SqlitePool,
    user_id: &str,
    source: &str,
    amount_cents: i64,
    artifacts: Option<Value>,
) -> Result<LoggedEarnings> {
    if user_id.trim().is_empty() {
        return Err(Error::InvalidInput("Missing required field: user_id".into()));
    }
    if source.trim().is_empty() {
        return Err(Error::InvalidInput("Missing required field: source".into()));
    }
    if amount_cents < 0 {
        return Err(Error::InvalidInput("Amount must not be negative".into()));
    }
    let artifacts = artifacts.map(|a| serde_json::to_string(&a)).transpose()?;

    let logged = retry_on_lock("log earnings", MAX_LOCK_WAIT_MS, || {
        let artifacts = artifacts.clone();
        async move {
            let now = time::now_stored();
            let payout_id = uuid_utils::new_id();
            let earning_id = uuid_utils::new_id();
            let mut tx = pool.begin().await?;

            sqlx::query(
                r#"
                INSERT INTO payouts (id, user_id, source, amount_cents, artifacts, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&payout_id)
            .bind(user_id)
            .bind(source)
            .bind(amount_cents)
            .bind(&artifacts)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            let tier: String = sqlx::query_scalar("SELECT tier FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .unwrap_or_else(|| UNKNOWN_TIER.to_string());
            let profit_retention = earnings_retention(&tier);

            sqlx::query(
                r#"
                INSERT INTO creator_earnings
                    (id, payout_id, user_id, source, amount_cents, tier, profit_retention, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&earning_id)
            .bind(&payout_id)
            .bind(user_id)
            .bind(source)
            .bind(amount_cents)
            .bind(&tier)
            .bind(profit_retention)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;

            Ok(LoggedEarnings {
                payout_id,
                earning_id,
                user_id: user_id.to_string(),
                amount_cents,
                tier,
                profit_retention,
            })
        }
    })
    .await?;

    info!(
        user_id = %user_id,
        amount_cents,
        tier = %logged.tier,
        "Logged earnings"
    );
    Ok(logged)
}

/// Gross payouts and net share for a user
///
/// Net applies the user's stored retention, not the ladder value recorded on
/// individual earnings rows.
pub async fn earnings_summary(pool: &SqlitePool, user_id: &str) -> Result<EarningsSummary> {
    let profit_retention: f64 =
        sqlx::query_scalar("SELECT profit_retention FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User not found: {}", user_id)))?;

    let gross_cents: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(amount_cents), 0) FROM payouts WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    Ok(EarningsSummary {
        user_id: user_id.to_string(),
        gross_cents,
        profit_retention,
        net_cents: (gross_cents as f64 * profit_retention).round() as i64,
    })
}

pub async fn list_earnings(pool: &SqlitePool, user_id: &str) -> Result<Vec<CreatorEarning>> {
    let rows = sqlx::query_as::<_, CreatorEarning>(
        r#"
        SELECT id, payout_id, user_id, source, amount_cents, tier, profit_retention, created_at
        FROM creator_earnings WHERE user_id = ? ORDER BY created_at, rowid
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
