//! Payment provider webhook reconciliation.
//!
//! Kartapay calls this endpoint asynchronously after a checkout. The payload
//! correlates to a subscription through `reference`; when a webhook secret is
//! configured the raw body must also carry a valid HMAC signature.

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    domain::reconcile::{map_provider_status, StatusAction, WEBHOOK_ACTIVATION_DAYS},
    models::SubscriptionStatus,
    services::kartapay::WEBHOOK_SIGNATURE_HEADER,
    services::metrics::WEBHOOKS_TOTAL,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub reference: Option<String>,
    pub transaction_id: Option<String>,
    pub status: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub status: String,
}

pub async fn kartapay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, AppError> {
    if state.kartapay.requires_webhook_signature() {
        let signature = headers
            .get(WEBHOOK_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::warn!("Missing webhook signature header");
                AppError::Unauthorized(anyhow::anyhow!("Missing webhook signature"))
            })?;

        let is_valid = state
            .kartapay
            .verify_webhook_signature(&body, signature)
            .map_err(|e| {
                tracing::error!(error = %e, "Webhook signature verification error");
                AppError::InternalError(anyhow::anyhow!("Webhook verification failed"))
            })?;

        if !is_valid {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "Invalid webhook signature"
            )));
        }
    }

    let payload: WebhookPayload = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid webhook payload: {}", e)))?;

    tracing::info!(
        reference = ?payload.reference,
        status = ?payload.status,
        amount = ?payload.amount,
        currency = ?payload.currency,
        "Webhook received"
    );

    let reference = payload
        .reference
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing reference")))?;

    let subscription_id = Uuid::parse_str(reference)
        .map_err(|_| AppError::NotFound(anyhow::anyhow!("Subscription not found")))?;

    let subscription = state
        .db
        .get_subscription(subscription_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Subscription not found")))?;

    let now = Utc::now();
    let (new_status, started_at, expires_at) = match map_provider_status(payload.status.as_deref())
    {
        StatusAction::Activate => (
            SubscriptionStatus::Active,
            Some(now),
            Some(now + Duration::days(WEBHOOK_ACTIVATION_DAYS)),
        ),
        StatusAction::Set(status) => (status, None, None),
        StatusAction::Keep => {
            tracing::info!(
                status = ?payload.status,
                current = %subscription.status,
                "Unknown provider status, keeping current"
            );
            (subscription.status(), None, None)
        }
    };

    state
        .db
        .apply_webhook_update(
            subscription_id,
            new_status,
            started_at,
            expires_at,
            payload.transaction_id.as_deref(),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Subscription not found")))?;

    WEBHOOKS_TOTAL
        .with_label_values(&[new_status.as_str()])
        .inc();

    tracing::info!(
        subscription_id = %subscription_id,
        status = %new_status.as_str(),
        "Subscription reconciled from webhook"
    );

    Ok(Json(WebhookResponse {
        success: true,
        status: new_status.as_str().to_string(),
    }))
}
