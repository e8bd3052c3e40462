//! Scheduled drops and the vault
//!
//! A drop is a vault artifact waiting for its unlock time. Running the
//! scheduler turns every due drop into one unsealed vault row.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::init::MAX_LOCK_WAIT_MS;
use super::models::{ScheduledDrop, VaultArtifact};
use super::retry_on_lock;
use crate::vault::TierFilter;
use crate::{time, uuid_utils, Error, Result};

/// Tag stamped on vault rows created by the scheduler
pub const DROP_RITUAL_TAG: &str = "scheduled_drop";

/// Drop submitted for scheduling
#[derive(Debug, Clone)]
pub struct NewDrop {
    pub title: String,
    pub tier_gate: String,
    pub unlock_at: DateTime<Utc>,
    pub content: Value,
    pub user_id: Option<String>,
}

pub async fn schedule_drop(pool: &SqlitePool, drop: NewDrop) -> Result<ScheduledDrop> {
    if drop.title.trim().is_empty() {
        return Err(Error::InvalidInput("Missing required field: title".into()));
    }
    if drop.tier_gate.trim().is_empty() {
        return Err(Error::InvalidInput("Missing required field: tier".into()));
    }

    let record = ScheduledDrop {
        id: uuid_utils::new_id(),
        title: drop.title,
        tier_gate: drop.tier_gate,
        unlock_at: time::to_stored(drop.unlock_at),
        content: sqlx::types::Json(drop.content),
        user_id: drop.user_id,
        status: "scheduled".to_string(),
        created_at: time::now_stored(),
    };

    sqlx::query(
        r#"
        INSERT INTO scheduled_drops (id, title, tier_gate, unlock_at, content, user_id, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 'scheduled', ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.title)
    .bind(&record.tier_gate)
    .bind(&record.unlock_at)
    .bind(serde_json::to_string(&record.content.0)?)
    .bind(&record.user_id)
    .bind(&record.created_at)
    .execute(pool)
    .await?;

    info!(drop_id = %record.id, unlock_at = %record.unlock_at, "Drop scheduled");
    Ok(record)
}

pub async fn get_drop(pool: &SqlitePool, id: &str) -> Result<Option<ScheduledDrop>> {
    let row = sqlx::query_as::<_, ScheduledDrop>(
        r#"
        SELECT id, title, tier_gate, unlock_at, content, user_id, status, created_at
        FROM scheduled_drops WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Drops still scheduled with `unlock_at <= now`, oldest unlock first
pub async fn due_drops(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Vec<ScheduledDrop>> {
    let rows = sqlx::query_as::<_, ScheduledDrop>(
        r#"
        SELECT id, title, tier_gate, unlock_at, content, user_id, status, created_at
        FROM scheduled_drops
        WHERE status = 'scheduled' AND unlock_at <= ?
        ORDER BY unlock_at ASC
        "#,
    )
    .bind(time::to_stored(now))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Execute every drop due at `now`; returns the ids actually executed
///
/// Each drop commits on its own. The status flip is conditional, so a drop
/// picked up by two overlapping runs lands in the vault once.
pub async fn run_due_drops(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Vec<String>> {
    let due = due_drops(pool, now).await?;
    let mut executed = Vec::with_capacity(due.len());

    for drop in &due {
        if execute_drop(pool, drop).await? {
            executed.push(drop.id.clone());
        } else {
            debug!(drop_id = %drop.id, "Drop already executed by another run");
        }
    }

    if !executed.is_empty() {
        info!(count = executed.len(), "Executed scheduled drops");
    }
    Ok(executed)
}

async fn execute_drop(pool: &SqlitePool, drop: &ScheduledDrop) -> Result<bool> {
    let content = serde_json::to_string(&drop.content.0)?;

    retry_on_lock("drop execution", MAX_LOCK_WAIT_MS, || {
        let content = content.clone();
        async move {
            let now = time::now_stored();
            let mut tx = pool.begin().await?;

            let flipped = sqlx::query(
                "UPDATE scheduled_drops SET status = 'executed' WHERE id = ? AND status = 'scheduled'",
            )
            .bind(&drop.id)
            .execute(&mut *tx)
            .await?;

            if flipped.rows_affected() == 0 {
                return Ok(false);
            }

            sqlx::query(
                r#"
                INSERT INTO vault
                    (id, drop_id, user_id, title, content, sealed, tier_gate,
                     unlock_at, unlocked_at, ritual_tag, created_at)
                VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(uuid_utils::new_id())
            .bind(&drop.id)
            .bind(&drop.user_id)
            .bind(&drop.title)
            .bind(&content)
            .bind(&drop.tier_gate)
            .bind(&drop.unlock_at)
            .bind(&now)
            .bind(DROP_RITUAL_TAG)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(true)
        }
    })
    .await
}

/// Unsealed artifacts visible to `user_id` under `filter`, newest unlock first
///
/// Artifacts without an owner are visible to every user.
pub async fn list_vault(
    pool: &SqlitePool,
    user_id: &str,
    filter: &TierFilter,
) -> Result<Vec<VaultArtifact>> {
    let rows = sqlx::query_as::<_, VaultArtifact>(
        r#"
        SELECT id, drop_id, user_id, title, content, sealed, tier_gate,
               unlock_at, unlocked_at, ritual_tag, created_at
        FROM vault
        WHERE sealed = 0 AND (user_id IS NULL OR user_id = ?)
        ORDER BY unlocked_at DESC, rowid DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter(|a| filter.admits(a.tier_gate.as_deref()))
        .collect())
}
