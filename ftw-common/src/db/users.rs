//! User records and tier upgrades
//!
//! Users and upgrades are priced by the catalog table.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use super::init::MAX_LOCK_WAIT_MS;
use super::models::{TierUpgrade, User};
use super::retry_on_lock;
use crate::tiers::{TierTableId, DEFAULT_USER_TIER};
use crate::{time, uuid_utils, Error, Result};

/// Result of a successful upgrade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeOutcome {
    pub user_id: String,
    pub from_tier: String,
    pub new_tier: String,
    pub profit_retention: f64,
    pub cost_cents: i64,
}

/// Create a user on a catalog tier (default `free`)
pub async fn create_user(
    pool: &SqlitePool,
    id: Option<String>,
    tier: Option<&str>,
) -> Result<User> {
    let tier_name = tier.unwrap_or(DEFAULT_USER_TIER);
    let spec = TierTableId::Catalog
        .lookup(tier_name)
        .ok_or_else(|| Error::InvalidInput(format!("Unknown tier: {}", tier_name)))?;

    let id = id.unwrap_or_else(uuid_utils::new_id);
    if id.trim().is_empty() {
        return Err(Error::InvalidInput("User id must not be empty".into()));
    }

    let now = time::now_stored();
    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO users (id, tier, profit_retention, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(spec.name)
    .bind(spec.profit_retention)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    if inserted.rows_affected() == 0 {
        return Err(Error::Conflict(format!("User already exists: {}", id)));
    }

    info!(user_id = %id, tier = spec.name, "Created user");

    Ok(User {
        id,
        tier: spec.name.to_string(),
        profit_retention: spec.profit_retention,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, tier, profit_retention, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Upgrade a user to a higher catalog tier
///
/// Validation happens before anything is read or written:
/// - unknown tier or payment below the catalog price: `InvalidInput`
/// - unknown user: `NotFound`
/// - target not ranked strictly above the current tier: `Conflict`
///
/// The tier update and the upgrade-ledger insert commit together. The update
/// is conditional on the tier read beforehand, so a concurrent upgrade of the
/// same user surfaces as `Conflict`.
pub async fn upgrade_tier(
    pool: &SqlitePool,
    user_id: &str,
    new_tier: &str,
    payment_cents: i64,
) -> Result<UpgradeOutcome> {
    let spec = TierTableId::Catalog
        .lookup(new_tier)
        .ok_or_else(|| Error::InvalidInput(format!("Unknown tier: {}", new_tier)))?;

    if payment_cents < spec.price_cents {
        return Err(Error::InvalidInput(format!(
            "Insufficient payment for {}: {} cents required, {} provided",
            spec.name, spec.price_cents, payment_cents
        )));
    }

    let user = get_user(pool, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User not found: {}", user_id)))?;

    let current_rank = TierTableId::Catalog.rank(&user.tier);
    let new_rank = TierTableId::Catalog.rank(spec.name);
    let is_step_up = match (current_rank, new_rank) {
        (Some(current), Some(target)) => target > current,
        // Users on a tier the catalog no longer lists may move to any tier
        (None, Some(_)) => true,
        _ => false,
    };
    if !is_step_up {
        return Err(Error::Conflict(format!(
            "Cannot move from {} to {}: tier must rank above the current one",
            user.tier, spec.name
        )));
    }

    let from_tier = user.tier;
    retry_on_lock("tier upgrade", MAX_LOCK_WAIT_MS, || {
        let from_tier = from_tier.clone();
        async move {
            let now = time::now_stored();
            let mut tx = pool.begin().await?;

            let updated = sqlx::query(
                r#"
                UPDATE users SET tier = ?, profit_retention = ?, updated_at = ?
                WHERE id = ? AND tier = ?
                "#,
            )
            .bind(spec.name)
            .bind(spec.profit_retention)
            .bind(&now)
            .bind(user_id)
            .bind(&from_tier)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(Error::Conflict(format!(
                    "Tier for user {} changed during upgrade",
                    user_id
                )));
            }

            sqlx::query(
                r#"
                INSERT INTO tier_upgrades
                    (id, user_id, from_tier, to_tier, cost_cents, profit_retention, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(uuid_utils::new_id())
            .bind(user_id)
            .bind(&from_tier)
            .bind(spec.name)
            .bind(spec.price_cents)
            .bind(spec.profit_retention)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(())
        }
    })
    .await?;

    info!(
        user_id = %user_id,
        from_tier = %from_tier,
        new_tier = spec.name,
        "Tier upgraded"
    );

    Ok(UpgradeOutcome {
        user_id: user_id.to_string(),
        from_tier,
        new_tier: spec.name.to_string(),
        profit_retention: spec.profit_retention,
        cost_cents: spec.price_cents,
    })
}

/// Upgrade ledger for one user, oldest first
pub async fn list_upgrades(pool: &SqlitePool, user_id: &str) -> Result<Vec<TierUpgrade>> {
    let rows = sqlx::query_as::<_, TierUpgrade>(
        r#"
        SELECT id, user_id, from_tier, to_tier, cost_cents, profit_retention, created_at
        FROM tier_upgrades WHERE user_id = ? ORDER BY created_at, rowid
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Total number of upgrade-ledger rows
pub async fn count_upgrades(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tier_upgrades")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
