//! ftw-server library
//!
//! HTTP surface of the ForTheWeebs ledger service: tier upgrades, the
//! governance ledger and event notary, payment routing, moderation, drops and
//! earnings.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use ftw_common::api::AuthWindow;
use ftw_common::ledger::{EventNotary, GovernanceLedger, LedgerEntry, NotaryEntry, NotaryEvent};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;
use tracing::error;

pub mod api;
pub mod error;
pub mod scheduler;
pub mod services;

use error::ApiResult;
use services::ContentClassifier;

/// Default admin timestamp window
pub const DEFAULT_AUTH_WINDOW_MS: i64 = 30_000;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Hash-chained governance ledger; held across the persisting write
    pub ledger: Arc<Mutex<GovernanceLedger>>,
    /// In-memory event notary
    pub notary: Arc<RwLock<EventNotary>>,
    /// Content classifier for payment routing
    pub classifier: Arc<dyn ContentClassifier>,
    /// Admin shared secret; 0 disables admin auth
    pub shared_secret: i64,
    pub auth_window: AuthWindow,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        ledger: GovernanceLedger,
        classifier: Arc<dyn ContentClassifier>,
        shared_secret: i64,
    ) -> Self {
        Self {
            db,
            ledger: Arc::new(Mutex::new(ledger)),
            notary: Arc::new(RwLock::new(EventNotary::default())),
            classifier,
            shared_secret,
            auth_window: AuthWindow::new(DEFAULT_AUTH_WINDOW_MS),
        }
    }

    pub fn with_auth_window(mut self, max_past_ms: i64) -> Self {
        self.auth_window = AuthWindow::new(max_past_ms);
        self
    }

    /// Append to the governance ledger and persist it before returning
    pub async fn inscribe(
        &self,
        action: &str,
        actor: &str,
        justification: &str,
    ) -> ApiResult<LedgerEntry> {
        let mut ledger = self.ledger.lock().await;
        Ok(ledger.inscribe_persisted(action, actor, justification).await?)
    }

    /// Commit a database change together with its governance entry
    ///
    /// The ledger lock is held throughout. The entry is appended in memory,
    /// `commit` runs, then the ledger is saved. A failed commit discards the
    /// entry. A failed save discards it and runs `revert`.
    pub async fn inscribe_with<T, C, CF, R, RF>(
        &self,
        action: &str,
        actor: &str,
        justification: &str,
        commit: C,
        revert: R,
    ) -> ApiResult<(T, LedgerEntry)>
    where
        C: FnOnce() -> CF,
        CF: Future<Output = ftw_common::Result<T>>,
        R: FnOnce() -> RF,
        RF: Future<Output = ftw_common::Result<()>>,
    {
        let mut ledger = self.ledger.lock().await;
        let entry = ledger.inscribe(action, actor, justification);

        let value = match commit().await {
            Ok(value) => value,
            Err(e) => {
                ledger.discard(entry.version);
                return Err(e.into());
            }
        };

        if let Err(e) = ledger.save().await {
            ledger.discard(entry.version);
            error!(action, version = entry.version, "Governance ledger write failed: {}", e);
            if let Err(revert_err) = revert().await {
                error!(action, "Revert after ledger failure also failed: {}", revert_err);
            }
            return Err(e.into());
        }

        Ok((value, entry))
    }

    /// Record an event in the notary
    pub async fn notarize(&self, event: NotaryEvent) -> NotaryEntry {
        self.notary.write().await.record(event)
    }
}

/// Build application router
///
/// Admin routes go through [`api::auth_middleware`]; everything else,
/// including `/health`, is open.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post};

    let auth_state = state.clone();
    let admin = move || middleware::from_fn_with_state(auth_state.clone(), api::auth_middleware);

    Router::new()
        .merge(api::health_routes())
        .route("/api/users", post(api::create_user))
        .route("/api/users/:id", get(api::get_user))
        .route("/api/tiers", get(api::list_tier_tables))
        .route("/api/tiers/:table", get(api::get_tier_table))
        .route("/api/upgrade-tier", post(api::upgrade_tier))
        .route(
            "/api/governance/inscribe",
            post(api::inscribe).route_layer(admin()),
        )
        .route("/api/governance/ledger", get(api::get_ledger))
        .route("/api/governance/verify", get(api::verify_ledger))
        .route(
            "/api/notary",
            get(api::query_notary).merge(
                post(api::record_notary)
                    .merge(delete(api::clear_notary))
                    .route_layer(admin()),
            ),
        )
        .route("/api/notary/stats", get(api::notary_stats))
        .route("/api/payments/route", post(api::route_payment))
        .route(
            "/api/payment-router/method/:creator_id",
            get(api::get_payout_method),
        )
        .route(
            "/api/payment-router/detect-content",
            post(api::detect_content),
        )
        .route("/api/payment-router/set-method", post(api::set_payout_method))
        .route(
            "/api/ban-proposals",
            get(api::list_ban_proposals).post(api::create_ban_proposal),
        )
        .route("/api/ban-verdict", post(api::ban_verdict).route_layer(admin()))
        .route(
            "/api/appeals",
            get(api::list_appeals).post(api::submit_appeal),
        )
        .route(
            "/api/appeals/verdict",
            post(api::appeal_verdict).route_layer(admin()),
        )
        .route("/api/schedule-drop", post(api::schedule_drop))
        .route(
            "/api/run-drop-scheduler",
            post(api::run_drop_scheduler).route_layer(admin()),
        )
        .route("/api/vault", get(api::get_vault))
        .route("/api/log-earnings", post(api::log_earnings))
        .route("/api/earnings/:user_id", get(api::get_earnings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
