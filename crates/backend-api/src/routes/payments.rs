use axum::{extract::State, http::HeaderMap, Json};
use lectern_learning::{PlanTier, Role, SubscriptionStatus};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{util::require_bearer, ApiError, AppState};

/// A confirmed payment, as relayed by staff or the payment webhook adapter.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmPaymentRequest {
    /// Public id of the paying account.
    pub account_id: String,
    /// `basic`, `standard` or `premium`.
    pub plan: String,
    /// Falls back to the plan's default length.
    pub duration_days: Option<i64>,
    #[serde(default)]
    pub auto_renew: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionResponse {
    #[schema(value_type = Object)]
    pub subscription: SubscriptionStatus,
}

#[utoipa::path(
    post,
    path = "/api/payments/confirm",
    tag = "Subscriptions",
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Subscription activated", body = SubscriptionResponse),
        (status = 400, description = "Unknown plan or bad duration", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller may not confirm payments", body = crate::error::ErrorResponse),
        (status = 404, description = "Account not found", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let actor = state
        .authenticate_with(&token, Role::can_confirm_payments)
        .await?;

    let plan: PlanTier = payload.plan.parse()?;
    let learners = state.learners();
    let account = learners
        .find_by_public_id(&payload.account_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Account {} not found", payload.account_id)))?;

    let subscription = learners
        .activate_subscription(account.id, plan, payload.duration_days, payload.auto_renew)
        .await?;

    info!(
        account = %account.public_id,
        confirmed_by = %actor.public_id,
        plan = plan.as_str(),
        "payment confirmed"
    );
    Ok(Json(SubscriptionResponse { subscription }))
}

#[utoipa::path(
    get,
    path = "/api/subscription",
    tag = "Subscriptions",
    responses(
        (status = 200, description = "Live subscription state", body = SubscriptionResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    let subscription = state.learners().subscription_status(account.id).await?;
    Ok(Json(SubscriptionResponse { subscription }))
}
