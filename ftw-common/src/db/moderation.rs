//! Ban proposals, appeals and their verdict ledgers
//!
//! A verdict is a one-shot transition. The state flip is a conditional update
//! inside the same transaction as the ledger insert, so two concurrent
//! verdicts for one record cannot both land.

use sqlx::SqlitePool;
use tracing::{info, warn};

use super::init::MAX_LOCK_WAIT_MS;
use super::models::{Appeal, AppealStatus, BanProposal};
use super::retry_on_lock;
use crate::{time, uuid_utils, Error, Result};

/// Reviewer recorded when a verdict does not name one
pub const DEFAULT_REVIEWER: &str = "admin";

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("Missing required field: {}", field)));
    }
    Ok(())
}

/// The named reviewer, or [`DEFAULT_REVIEWER`] when none is given
pub fn reviewer_or_default(reviewed_by: Option<&str>) -> &str {
    reviewed_by
        .filter(|r| !r.trim().is_empty())
        .unwrap_or(DEFAULT_REVIEWER)
}

pub async fn create_ban_proposal(
    pool: &SqlitePool,
    user_id: &str,
    reason: &str,
    proposed_by: Option<&str>,
) -> Result<BanProposal> {
    require("user_id", user_id)?;
    require("reason", reason)?;

    let proposal = BanProposal {
        id: uuid_utils::new_id(),
        user_id: user_id.to_string(),
        reason: reason.to_string(),
        proposed_by: proposed_by.map(str::to_string),
        verdict: None,
        reviewed: false,
        reviewed_by: None,
        reviewed_at: None,
        created_at: time::now_stored(),
    };

    sqlx::query(
        r#"
        INSERT INTO ban_proposals (id, user_id, reason, proposed_by, reviewed, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&proposal.id)
    .bind(&proposal.user_id)
    .bind(&proposal.reason)
    .bind(&proposal.proposed_by)
    .bind(&proposal.created_at)
    .execute(pool)
    .await?;

    info!(ban_id = %proposal.id, user_id = %user_id, "Ban proposed");
    Ok(proposal)
}

/// Unreviewed proposals first, newest first within each group
pub async fn list_ban_proposals(pool: &SqlitePool) -> Result<Vec<BanProposal>> {
    let rows = sqlx::query_as::<_, BanProposal>(
        r#"
        SELECT id, user_id, reason, proposed_by, verdict, reviewed, reviewed_by,
               reviewed_at, created_at
        FROM ban_proposals
        ORDER BY reviewed ASC, created_at DESC, rowid DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_ban_proposal(pool: &SqlitePool, id: &str) -> Result<Option<BanProposal>> {
    let row = sqlx::query_as::<_, BanProposal>(
        r#"
        SELECT id, user_id, reason, proposed_by, verdict, reviewed, reviewed_by,
               reviewed_at, created_at
        FROM ban_proposals WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Record a verdict on a ban proposal
///
/// `NotFound` for an unknown id, `Conflict` if the proposal was already
/// reviewed (including by a concurrent caller).
pub async fn record_ban_verdict(
    pool: &SqlitePool,
    ban_id: &str,
    verdict: &str,
    reviewed_by: Option<&str>,
) -> Result<BanProposal> {
    require("ban_id", ban_id)?;
    require("verdict", verdict)?;
    let reviewer = reviewer_or_default(reviewed_by);

    retry_on_lock("ban verdict", MAX_LOCK_WAIT_MS, || async move {
        let now = time::now_stored();
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE ban_proposals
            SET verdict = ?, reviewed = 1, reviewed_by = ?, reviewed_at = ?
            WHERE id = ? AND reviewed = 0
            "#,
        )
        .bind(verdict)
        .bind(reviewer)
        .bind(&now)
        .bind(ban_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM ban_proposals WHERE id = ?")
                .bind(ban_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => Error::Conflict(format!("Ban proposal already reviewed: {}", ban_id)),
                None => Error::NotFound(format!("Ban proposal not found: {}", ban_id)),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO ban_ledger (id, ban_id, verdict, reviewed_by, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid_utils::new_id())
        .bind(ban_id)
        .bind(verdict)
        .bind(reviewer)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    })
    .await?;

    info!(ban_id = %ban_id, verdict = %verdict, reviewed_by = %reviewer, "Ban verdict recorded");

    get_ban_proposal(pool, ban_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Ban proposal not found: {}", ban_id)))
}

/// Undo a recorded ban verdict, returning the proposal to unreviewed
///
/// Used when the verdict could not be inscribed in the governance ledger.
pub async fn revert_ban_verdict(pool: &SqlitePool, ban_id: &str) -> Result<()> {
    retry_on_lock("revert ban verdict", MAX_LOCK_WAIT_MS, || async move {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM ban_ledger WHERE ban_id = ?")
            .bind(ban_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE ban_proposals
            SET verdict = NULL, reviewed = 0, reviewed_by = NULL, reviewed_at = NULL
            WHERE id = ?
            "#,
        )
        .bind(ban_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    })
    .await?;

    warn!(ban_id = %ban_id, "Ban verdict reverted");
    Ok(())
}

/// Number of ban-ledger rows for a proposal
pub async fn count_ban_ledger(pool: &SqlitePool, ban_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ban_ledger WHERE ban_id = ?")
        .bind(ban_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn submit_appeal(pool: &SqlitePool, user_id: &str, reason: &str) -> Result<Appeal> {
    require("user_id", user_id)?;
    require("reason", reason)?;

    let appeal = Appeal {
        id: uuid_utils::new_id(),
        user_id: user_id.to_string(),
        reason: reason.to_string(),
        status: AppealStatus::Pending.as_str().to_string(),
        verdict: None,
        reviewed_by: None,
        reviewed_at: None,
        created_at: time::now_stored(),
    };

    sqlx::query(
        r#"
        INSERT INTO appeals (id, user_id, reason, status, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&appeal.id)
    .bind(&appeal.user_id)
    .bind(&appeal.reason)
    .bind(&appeal.status)
    .bind(&appeal.created_at)
    .execute(pool)
    .await?;

    info!(appeal_id = %appeal.id, user_id = %user_id, "Appeal submitted");
    Ok(appeal)
}

/// Appeals, newest first, optionally restricted to one status
pub async fn list_appeals(pool: &SqlitePool, status: Option<AppealStatus>) -> Result<Vec<Appeal>> {
    let rows = sqlx::query_as::<_, Appeal>(
        r#"
        SELECT id, user_id, reason, status, verdict, reviewed_by, reviewed_at, created_at
        FROM appeals
        WHERE (?1 IS NULL OR status = ?1)
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_appeal(pool: &SqlitePool, id: &str) -> Result<Option<Appeal>> {
    let row = sqlx::query_as::<_, Appeal>(
        r#"
        SELECT id, user_id, reason, status, verdict, reviewed_by, reviewed_at, created_at
        FROM appeals WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Review a pending appeal and copy it into the appeal ledger
pub async fn record_appeal_verdict(
    pool: &SqlitePool,
    appeal_id: &str,
    verdict: &str,
    reviewed_by: Option<&str>,
) -> Result<Appeal> {
    require("appeal_id", appeal_id)?;
    require("verdict", verdict)?;
    let reviewer = reviewer_or_default(reviewed_by);

    retry_on_lock("appeal verdict", MAX_LOCK_WAIT_MS, || async move {
        let now = time::now_stored();
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE appeals
            SET status = 'reviewed', verdict = ?, reviewed_by = ?, reviewed_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(verdict)
        .bind(reviewer)
        .bind(&now)
        .bind(appeal_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM appeals WHERE id = ?")
                .bind(appeal_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => Error::Conflict(format!("Appeal already reviewed: {}", appeal_id)),
                None => Error::NotFound(format!("Appeal not found: {}", appeal_id)),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO appeal_ledger (id, appeal_id, user_id, reason, verdict, reviewed_by, created_at)
            SELECT ?, id, user_id, reason, ?, ?, ? FROM appeals WHERE id = ?
            "#,
        )
        .bind(uuid_utils::new_id())
        .bind(verdict)
        .bind(reviewer)
        .bind(&now)
        .bind(appeal_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    })
    .await?;

    info!(appeal_id = %appeal_id, verdict = %verdict, "Appeal reviewed");

    get_appeal(pool, appeal_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Appeal not found: {}", appeal_id)))
}

/// Undo a recorded appeal verdict, returning the appeal to pending
pub async fn revert_appeal_verdict(pool: &SqlitePool, appeal_id: &str) -> Result<()> {
    retry_on_lock("revert appeal verdict", MAX_LOCK_WAIT_MS, || async move {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM appeal_ledger WHERE appeal_id = ?")
            .bind(appeal_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE appeals
            SET status = 'pending', verdict = NULL, reviewed_by = NULL, reviewed_at = NULL
            WHERE id = ?
            "#,
        )
        .bind(appeal_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    })
    .await?;

    warn!(appeal_id = %appeal_id, "Appeal verdict reverted");
    Ok(())
}

/// Number of appeal-ledger rows for an appeal
pub async fn count_appeal_ledger(pool: &SqlitePool, appeal_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appeal_ledger WHERE appeal_id = ?")
        .bind(appeal_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
