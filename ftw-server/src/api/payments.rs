//! Payment routing and creator payout profiles

use axum::{
    extract::{Path, State},
    Json,
};
use ftw_common::db::{profiles, CreatorProfile, PaymentDecision};
use ftw_common::ledger::NotaryEvent;
use ftw_common::payments::{resolve_method, route_by_content, PayoutMethod, SafeSearch};
use ftw_common::tiers::usd_to_cents;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::required;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RoutePaymentRequest {
    pub content_url: Option<String>,
    /// USD
    pub amount: Option<f64>,
    pub creator_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RoutePaymentResponse {
    pub decision: String,
    pub reason: String,
    pub safe_search: Option<SafeSearch>,
    pub error: Option<String>,
    pub receipt: PaymentDecision,
}

/// POST /api/payments/route
///
/// A classifier failure routes to crypto rather than failing the request.
pub async fn route_payment(
    State(state): State<AppState>,
    Json(req): Json<RoutePaymentRequest>,
) -> ApiResult<Json<RoutePaymentResponse>> {
    let content_url = required("content_url", req.content_url)?;
    let creator_id = required("creator_id", req.creator_id)?;
    let amount = required("amount", req.amount)?;
    let amount_cents = usd_to_cents(amount)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid amount: {}", amount)))?;

    let classification = state.classifier.classify(&content_url).await;
    if let Err(e) = &classification {
        warn!(url = %content_url, error = %e, "Classifier failed, routing to crypto");
    }
    let route = route_by_content(classification);

    let receipt =
        profiles::record_payment_decision(&state.db, &content_url, amount_cents, &creator_id, &route)
            .await?;

    Ok(Json(RoutePaymentResponse {
        decision: route.decision.as_str().to_string(),
        reason: route.reason.to_string(),
        safe_search: route.safe_search,
        error: route.error,
        receipt,
    }))
}

#[derive(Debug, Serialize)]
pub struct PayoutMethodResponse {
    pub creator_id: String,
    pub method: PayoutMethod,
    pub reason: &'static str,
    /// Wallet to pay when the method is crypto
    pub wallet_address: Option<String>,
    /// Connect account to pay when the method is stripe_connect
    pub account_id: Option<String>,
    pub payment_setup_complete: bool,
}

/// GET /api/payment-router/method/:creator_id
///
/// Only the account details for the resolved method are returned.
pub async fn get_payout_method(
    State(state): State<AppState>,
    Path(creator_id): Path<String>,
) -> ApiResult<Json<PayoutMethodResponse>> {
    let profile = profiles::get_profile(&state.db, &creator_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Creator not found: {}", creator_id)))?;

    let choice = resolve_method(&profile.routing());
    let (wallet_address, account_id) = match choice.method {
        PayoutMethod::Crypto => (profile.crypto_wallet_address, None),
        PayoutMethod::StripeConnect => (None, profile.stripe_connect_account_id),
    };
    Ok(Json(PayoutMethodResponse {
        creator_id,
        method: choice.method,
        reason: choice.reason,
        wallet_address,
        account_id,
        payment_setup_complete: profile.payment_setup_complete,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DetectContentRequest {
    pub creator_id: Option<String>,
    pub content_url: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DetectContentResponse {
    pub creator_id: String,
    pub classified: bool,
    pub is_adult: bool,
    pub safe_search: Option<SafeSearch>,
    pub profile: Option<CreatorProfile>,
}

fn is_classifiable(content_type: &str) -> bool {
    let kind = content_type.split('/').next().unwrap_or_default();
    kind.eq_ignore_ascii_case("image") || kind.eq_ignore_ascii_case("video")
}

/// POST /api/payment-router/detect-content
///
/// Only images and video are classified; content without a `content_type`
/// is left unclassified. Adult content permanently forces the creator onto
/// crypto payouts.
pub async fn detect_content(
    State(state): State<AppState>,
    Json(req): Json<DetectContentRequest>,
) -> ApiResult<Json<DetectContentResponse>> {
    let creator_id = required("creator_id", req.creator_id)?;
    let content_url = required("content_url", req.content_url)?;
    let classifiable = req.content_type.as_deref().is_some_and(is_classifiable);

    if !classifiable {
        return Ok(Json(DetectContentResponse {
            creator_id,
            classified: false,
            is_adult: false,
            safe_search: None,
            profile: None,
        }));
    }

    let safe_search = state
        .classifier
        .classify(&content_url)
        .await
        .map_err(|e| ApiError::BadGateway(format!("Content classification failed: {}", e)))?;

    let is_adult = safe_search.is_adult_for_profile();
    let profile = if is_adult {
        let profile = profiles::mark_adult(&state.db, &creator_id).await?;
        state
            .notarize(
                NotaryEvent::new("creator_marked_adult")
                    .key(format!("creators/{}/payment_type", creator_id))
                    .value(json!("crypto")),
            )
            .await;
        Some(profile)
    } else {
        profiles::get_profile(&state.db, &creator_id).await?
    };

    info!(creator_id = %creator_id, is_adult, "Content classified");

    Ok(Json(DetectContentResponse {
        creator_id,
        classified: true,
        is_adult,
        safe_search: Some(safe_search),
        profile,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SetMethodRequest {
    pub creator_id: Option<String>,
    pub payment_type: Option<String>,
    pub wallet_address: Option<String>,
    pub stripe_account_id: Option<String>,
}

/// POST /api/payment-router/set-method
pub async fn set_payout_method(
    State(state): State<AppState>,
    Json(req): Json<SetMethodRequest>,
) -> ApiResult<Json<CreatorProfile>> {
    let creator_id = required("creator_id", req.creator_id)?;
    let payment_type = required("payment_type", req.payment_type)?;
    let method = PayoutMethod::parse(&payment_type)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown payment_type: {}", payment_type)))?;

    let previous = profiles::get_profile(&state.db, &creator_id)
        .await?
        .and_then(|p| p.payment_type);

    let profile = profiles::set_payout_method(
        &state.db,
        &creator_id,
        method,
        req.wallet_address.as_deref(),
        req.stripe_account_id.as_deref(),
    )
    .await?;

    let mut event = NotaryEvent::new("set_payment_method")
        .actor(&creator_id)
        .key(format!("creators/{}/payment_type", creator_id))
        .value(json!(method.as_str()));
    if let Some(previous) = previous {
        event = event.old_value(json!(previous));
    }
    state.notarize(event).await;

    Ok(Json(profile))
}
