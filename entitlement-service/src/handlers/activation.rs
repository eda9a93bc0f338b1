//! Activation code redemption.
//!
//! A code is a single-use voucher worth one calendar year of entitlement.
//! Consumption of the code and activation of the subscription commit as one
//! transaction; on any failure the code stays unused.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::renewal, middleware::AuthenticatedUser, services::metrics::ACTIVATIONS_TOTAL, AppState,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
    #[validate(length(min = 1, message = "activation code is required"))]
    pub activation_code: String,
    #[validate(length(min = 1, message = "business id is required"))]
    pub business_id: String,
}

#[derive(Debug, Serialize)]
pub struct ActivateResponse {
    pub success: bool,
    pub expires_at: DateTime<Utc>,
}

pub async fn activate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ActivateRequest>,
) -> Result<Json<ActivateResponse>, AppError> {
    payload.validate()?;

    let business_id = Uuid::parse_str(&payload.business_id)
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid business id")))?;

    tracing::info!(
        user_id = %user.user_id,
        business_id = %business_id,
        "Activation code redemption requested"
    );

    let now = Utc::now();

    let code = state
        .db
        .find_unused_code(&payload.activation_code)
        .await?
        .ok_or_else(|| {
            ACTIVATIONS_TOTAL.with_label_values(&["invalid_code"]).inc();
            AppError::BadRequest(anyhow::anyhow!("Invalid activation code"))
        })?;

    if let Some(expires_at) = code.expires_at {
        if expires_at < now {
            ACTIVATIONS_TOTAL.with_label_values(&["code_expired"]).inc();
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Activation code expired"
            )));
        }
    }

    let subscription = state
        .db
        .latest_subscription(business_id)
        .await?
        .ok_or_else(|| {
            ACTIVATIONS_TOTAL
                .with_label_values(&["no_subscription"])
                .inc();
            AppError::BadRequest(anyhow::anyhow!("No subscription found for this business"))
        })?;

    // Remaining paid or trial time is preserved; one year stacks on top.
    let new_expires_at = renewal::renewal_expiry(&subscription, now);

    state
        .db
        .redeem_code(&code, &subscription, business_id, now, new_expires_at)
        .await?;

    ACTIVATIONS_TOTAL.with_label_values(&["redeemed"]).inc();

    tracing::info!(
        subscription_id = %subscription.id,
        expires_at = %new_expires_at,
        "Subscription activated by code"
    );

    Ok(Json(ActivateResponse {
        success: true,
        expires_at: new_expires_at,
    }))
}
