//! Creator payment profiles and payment routing receipts

use sqlx::SqlitePool;
use tracing::{info, warn};

use super::models::{CreatorProfile, PaymentDecision};
use crate::payments::{ContentRating, ContentRoute, PayoutMethod, ProfileRouting};
use crate::{time, uuid_utils, Error, Result};

impl CreatorProfile {
    /// Routing view of the stored profile; unrecognized values read as unset
    pub fn routing(&self) -> ProfileRouting {
        ProfileRouting {
            forced_crypto_only: self.forced_crypto_only,
            payment_type: self.payment_type.as_deref().and_then(PayoutMethod::parse),
            content_rating: ContentRating::parse(&self.content_rating),
        }
    }
}

pub async fn get_profile(pool: &SqlitePool, creator_id: &str) -> Result<Option<CreatorProfile>> {
    let row = sqlx::query_as::<_, CreatorProfile>(
        r#"
        SELECT creator_id, payment_type, content_rating, forced_crypto_only,
               crypto_wallet_address, stripe_connect_account_id,
               payment_setup_complete, updated_at
        FROM creator_profiles WHERE creator_id = ?
        "#,
    )
    .bind(creator_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Mark a creator as adult: crypto payouts only, from now on
pub async fn mark_adult(pool: &SqlitePool, creator_id: &str) -> Result<CreatorProfile> {
    sqlx::query(
        r#"
        INSERT INTO creator_profiles
            (creator_id, payment_type, content_rating, forced_crypto_only, updated_at)
        VALUES (?1, 'crypto', 'adult', 1, ?2)
        ON CONFLICT(creator_id) DO UPDATE SET
            payment_type = 'crypto',
            content_rating = 'adult',
            forced_crypto_only = 1,
            updated_at = ?2
        "#,
    )
    .bind(creator_id)
    .bind(time::now_stored())
    .execute(pool)
    .await?;

    warn!(creator_id = %creator_id, "Creator marked adult, payouts forced to crypto");

    get_profile(pool, creator_id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Profile vanished after update: {}", creator_id)))
}

/// Store a creator's chosen payout method
///
/// `Forbidden` when the creator is forced to crypto and asks for anything
/// else. Setup is complete once the chosen method has its account detail.
pub async fn set_payout_method(
    pool: &SqlitePool,
    creator_id: &str,
    method: PayoutMethod,
    wallet_address: Option<&str>,
    stripe_account_id: Option<&str>,
) -> Result<CreatorProfile> {
    if creator_id.trim().is_empty() {
        return Err(Error::InvalidInput("Missing required field: creator_id".into()));
    }

    if let Some(existing) = get_profile(pool, creator_id).await? {
        if existing.forced_crypto_only && method != PayoutMethod::Crypto {
            return Err(Error::Forbidden(
                "Adult content creators must use crypto payments".into(),
            ));
        }
    }

    let setup_complete = match method {
        PayoutMethod::Crypto => wallet_address.is_some(),
        PayoutMethod::StripeConnect => stripe_account_id.is_some(),
    };

    // The guard is repeated in the WHERE clause so a concurrent mark_adult
    // between the read and the write cannot be overwritten.
    let result = sqlx::query(
        r#"
        INSERT INTO creator_profiles
            (creator_id, payment_type, content_rating, forced_crypto_only,
             crypto_wallet_address, stripe_connect_account_id,
             payment_setup_complete, updated_at)
        VALUES (?1, ?2, 'sfw', 0, ?3, ?4, ?5, ?6)
        ON CONFLICT(creator_id) DO UPDATE SET
            payment_type = excluded.payment_type,
            crypto_wallet_address = COALESCE(excluded.crypto_wallet_address, crypto_wallet_address),
            stripe_connect_account_id =
                COALESCE(excluded.stripe_connect_account_id, stripe_connect_account_id),
            payment_setup_complete = excluded.payment_setup_complete,
            updated_at = excluded.updated_at
        WHERE forced_crypto_only = 0 OR excluded.payment_type = 'crypto'
        "#,
    )
    .bind(creator_id)
    .bind(method.as_str())
    .bind(wallet_address)
    .bind(stripe_account_id)
    .bind(setup_complete)
    .bind(time::now_stored())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::Forbidden(
            "Adult content creators must use crypto payments".into(),
        ));
    }

    info!(creator_id = %creator_id, method = method.as_str(), "Payout method set");

    get_profile(pool, creator_id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Profile vanished after update: {}", creator_id)))
}

/// Persist the receipt for one routing decision
pub async fn record_payment_decision(
    pool: &SqlitePool,
    content_url: &str,
    amount_cents: i64,
    creator_id: &str,
    route: &ContentRoute,
) -> Result<PaymentDecision> {
    let safe_search = route.safe_search;
    let decision = PaymentDecision {
        id: uuid_utils::new_id(),
        content_url: content_url.to_string(),
        amount_cents,
        creator_id: creator_id.to_string(),
        adult: safe_search.map(|s| s.adult.as_str().to_string()),
        racy: safe_search.map(|s| s.racy.as_str().to_string()),
        violence: safe_search.map(|s| s.violence.as_str().to_string()),
        decision: route.decision.as_str().to_string(),
        reason: route.reason.to_string(),
        error: route.error.clone(),
        created_at: time::now_stored(),
    };

    sqlx::query(
        r#"
        INSERT INTO payment_decisions
            (id, content_url, amount_cents, creator_id, adult, racy, violence,
             decision, reason, error, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&decision.id)
    .bind(&decision.content_url)
    .bind(decision.amount_cents)
    .bind(&decision.creator_id)
    .bind(&decision.adult)
    .bind(&decision.racy)
    .bind(&decision.violence)
    .bind(&decision.decision)
    .bind(&decision.reason)
    .bind(&decision.error)
    .bind(&decision.created_at)
    .execute(pool)
    .await?;

    info!(
        creator_id = %creator_id,
        decision = %decision.decision,
        amount_cents,
        "Payment routed"
    );
    Ok(decision)
}

pub async fn list_payment_decisions(
    pool: &SqlitePool,
    creator_id: &str,
) -> Result<Vec<PaymentDecision>> {
    let rows = sqlx::query_as::<_, PaymentDecision>(
        r#"
        SELECT id, content_url, amount_cents, creator_id, adult, racy, violence,
               decision, reason, error, created_at
        FROM payment_decisions WHERE creator_id = ? ORDER BY created_at, rowid
        "#,
    )
    .bind(creator_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
