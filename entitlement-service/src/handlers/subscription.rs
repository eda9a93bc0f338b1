//! Subscription state and checkout initiation.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::evaluator::{self, EntitlementSnapshot},
    middleware::AuthenticatedUser,
    models::{Business, CreateSubscription, Subscription, CHECKOUT_CURRENCY},
    services::kartapay::CreatePaymentRequest,
    services::metrics::CHECKOUTS_TOTAL,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct CurrentQuery {
    pub business_id: Uuid,
}

/// Latest subscription row plus the evaluated entitlement state. The
/// evaluation runs fresh on every request; nothing here is cached.
#[derive(Debug, Serialize)]
pub struct CurrentResponse {
    pub subscription: Option<Subscription>,
    #[serde(flatten)]
    pub entitlement: EntitlementSnapshot,
}

pub async fn current(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<CurrentQuery>,
) -> Result<Json<CurrentResponse>, AppError> {
    let business = require_owned_business(&state, &user, query.business_id).await?;

    let subscription = state.db.latest_subscription(business.id).await?;
    let entitlement = evaluator::evaluate(subscription.as_ref(), Utc::now());

    Ok(Json(CurrentResponse {
        subscription,
        entitlement,
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "plan id is required"))]
    pub plan_id: String,
    pub plan_name: Option<String>,
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,
    pub business_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub checkout_url: String,
    pub subscription_id: Uuid,
    pub transaction_id: Option<String>,
}

/// Start a provider checkout: create a pending subscription row, then a
/// provider payment referencing it. The webhook completes the cycle.
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    payload.validate()?;

    if !state.kartapay.is_configured() {
        return Err(AppError::InternalError(anyhow::anyhow!(
            "Kartapay is not configured for this environment"
        )));
    }

    let business = require_owned_business(&state, &user, payload.business_id).await?;

    tracing::info!(
        business_id = %business.id,
        plan_id = %payload.plan_id,
        amount = payload.amount,
        "Starting Kartapay checkout"
    );

    let subscription = state
        .db
        .create_pending_subscription(&CreateSubscription {
            business_id: business.id,
            plan_id: payload.plan_id.clone(),
            amount: payload.amount,
            currency: CHECKOUT_CURRENCY.to_string(),
        })
        .await?;

    let plan_label = payload.plan_name.as_deref().unwrap_or(&payload.plan_id);
    let frontend = state.kartapay.frontend_base_url();
    let payment_request = CreatePaymentRequest {
        merchant_id: state.kartapay.merchant_id().to_string(),
        amount: payload.amount,
        currency: CHECKOUT_CURRENCY.to_string(),
        description: format!("Abonnement {}", plan_label),
        reference: subscription.id,
        success_url: format!(
            "{}/subscription?status=success&subscription_id={}",
            frontend, subscription.id
        ),
        cancel_url: format!("{}/subscription?status=cancelled", frontend),
        webhook_url: format!("{}/webhooks/kartapay", state.kartapay.webhook_base_url()),
    };

    let payment = match state.kartapay.create_payment(&payment_request).await {
        Ok(payment) => payment,
        Err(e) => {
            tracing::error!(error = %e, subscription_id = %subscription.id, "Payment creation failed");
            // The row stays around as a failed attempt; nothing was charged.
            state.db.mark_subscription_failed(subscription.id).await?;
            CHECKOUTS_TOTAL.with_label_values(&["provider_error"]).inc();
            return Err(AppError::BadGateway(format!(
                "Payment creation failed: {}",
                e
            )));
        }
    };

    if let Some(ref transaction_id) = payment.transaction_id {
        state
            .db
            .set_provider_transaction_id(subscription.id, transaction_id)
            .await?;
    }

    let checkout_url = payment
        .redirect_url()
        .ok_or_else(|| AppError::BadGateway("Provider returned no checkout URL".to_string()))?
        .to_string();

    CHECKOUTS_TOTAL.with_label_values(&["created"]).inc();

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            success: true,
            checkout_url,
            subscription_id: subscription.id,
            transaction_id: payment.transaction_id,
        }),
    ))
}

/// Fetch a business and check it belongs to the caller.
async fn require_owned_business(
    state: &AppState,
    user: &AuthenticatedUser,
    business_id: Uuid,
) -> Result<Business, AppError> {
    let business = state
        .db
        .get_business(business_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Business not found")))?;

    if business.user_id != user.user_id {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Business does not belong to the caller"
        )));
    }

    Ok(business)
}
