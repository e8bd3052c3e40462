//! Database initialization
//!
//! Opens (or creates) the SQLite database and brings the schema up to date.
//! Every statement is idempotent, so this runs on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Busy timeout applied to every pooled connection
pub const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Upper bound for [`crate::db::retry_on_lock`] on write transactions
pub const MAX_LOCK_WAIT_MS: u64 = 10_000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                // Per-connection pragmas; a pool-level PRAGMA would only reach
                // whichever connection happened to run it.
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query(&format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL persists in the file, so once is enough
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_users_table(pool).await?;
    create_tier_upgrades_table(pool).await?;
    create_ban_tables(pool).await?;
    create_appeal_tables(pool).await?;
    create_drop_tables(pool).await?;
    create_earnings_tables(pool).await?;
    create_payment_tables(pool).await?;
    Ok(())
}

/// Application configuration key-value pairs
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            tier TEXT NOT NULL,
            profit_retention REAL NOT NULL
                CHECK (profit_retention >= 0.0 AND profit_retention <= 1.0),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_tier_upgrades_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tier_upgrades (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            from_tier TEXT NOT NULL,
            to_tier TEXT NOT NULL,
            cost_cents INTEGER NOT NULL,
            profit_retention REAL NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tier_upgrades_user ON tier_upgrades(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_ban_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ban_proposals (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            reason TEXT NOT NULL,
            proposed_by TEXT,
            verdict TEXT,
            reviewed INTEGER NOT NULL DEFAULT 0,
            reviewed_by TEXT,
            reviewed_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ban_ledger (
            id TEXT PRIMARY KEY,
            ban_id TEXT NOT NULL REFERENCES ban_proposals(id),
            verdict TEXT NOT NULL,
            reviewed_by TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_appeal_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appeals (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            reason TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'reviewed')),
            verdict TEXT,
            reviewed_by TEXT,
            reviewed_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appeal_ledger (
            id TEXT PRIMARY KEY,
            appeal_id TEXT NOT NULL REFERENCES appeals(id),
            user_id TEXT NOT NULL,
            reason TEXT NOT NULL,
            verdict TEXT NOT NULL,
            reviewed_by TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_drop_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scheduled_drops (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            tier_gate TEXT NOT NULL,
            unlock_at TEXT NOT NULL,
            content TEXT NOT NULL,
            user_id TEXT,
            status TEXT NOT NULL DEFAULT 'scheduled'
                CHECK (status IN ('scheduled', 'executed')),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_scheduled_drops_due ON scheduled_drops(status, unlock_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vault (
            id TEXT PRIMARY KEY,
            drop_id TEXT UNIQUE REFERENCES scheduled_drops(id),
            user_id TEXT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            sealed INTEGER NOT NULL DEFAULT 1,
            tier_gate TEXT,
            unlock_at TEXT,
            unlocked_at TEXT,
            ritual_tag TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_earnings_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payouts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            source TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            artifacts TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_payouts_user ON payouts(user_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS creator_earnings (
            id TEXT PRIMARY KEY,
            payout_id TEXT NOT NULL REFERENCES payouts(id),
            user_id TEXT NOT NULL,
            source TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            tier TEXT NOT NULL,
            profit_retention REAL NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_payment_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS creator_profiles (
            creator_id TEXT PRIMARY KEY,
            payment_type TEXT CHECK (payment_type IN ('crypto', 'stripe_connect')),
            content_rating TEXT NOT NULL DEFAULT 'sfw',
            forced_crypto_only INTEGER NOT NULL DEFAULT 0,
            crypto_wallet_address TEXT,
            stripe_connect_account_id TEXT,
            payment_setup_complete INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payment_decisions (
            id TEXT PRIMARY KEY,
            content_url TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            creator_id TEXT NOT NULL,
            adult TEXT,
            racy TEXT,
            violence TEXT,
            decision TEXT NOT NULL,
            reason TEXT NOT NULL,
            error TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
