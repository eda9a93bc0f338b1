//! Back-office management of activation codes. Every route here sits behind
//! the admin API key middleware.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    domain::code,
    models::{ActivationCode, CodePlan},
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCodeRequest {
    pub plan: CodePlan,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// How many codes to mint in one call; defaults to 1.
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct CreateCodeResponse {
    pub success: bool,
    pub codes: Vec<ActivationCode>,
}

#[derive(Debug, Serialize)]
pub struct ListCodesResponse {
    pub success: bool,
    pub codes: Vec<ActivationCode>,
}

const MAX_CODES_PER_BATCH: u32 = 100;

/// Mint one or more activation codes for a plan. A collision with an
/// existing code is retried with a fresh code rather than surfaced.
pub async fn create_codes(
    State(state): State<AppState>,
    Json(payload): Json<CreateCodeRequest>,
) -> Result<(StatusCode, Json<CreateCodeResponse>), AppError> {
    if payload.count == 0 || payload.count > MAX_CODES_PER_BATCH {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "count must be between 1 and {}",
            MAX_CODES_PER_BATCH
        )));
    }

    let mut codes = Vec::with_capacity(payload.count as usize);
    for _ in 0..payload.count {
        codes.push(mint_code(&state, payload.plan, payload.expires_at).await?);
    }

    tracing::info!(
        plan = ?payload.plan,
        count = codes.len(),
        "Activation codes minted"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateCodeResponse {
            success: true,
            codes,
        }),
    ))
}

async fn mint_code(
    state: &AppState,
    plan: CodePlan,
    expires_at: Option<DateTime<Utc>>,
) -> Result<ActivationCode, AppError> {
    // The code space is 36^12; a collision is a fluke, not a steady state.
    for _ in 0..3 {
        let candidate = code::generate_code(&mut rand::thread_rng());
        match state
            .db
            .create_activation_code(&candidate, plan.amount(), plan.duration_months(), expires_at)
            .await
        {
            Ok(created) => return Ok(created),
            Err(AppError::Conflict(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(AppError::InternalError(anyhow::anyhow!(
        "Could not mint a unique activation code"
    )))
}

/// List every activation code, newest first.
pub async fn list_codes(
    State(state): State<AppState>,
) -> Result<Json<ListCodesResponse>, AppError> {
    let codes = state.db.list_activation_codes().await?;
    Ok(Json(ListCodesResponse {
        success: true,
        codes,
    }))
}

/// Delete an activation code by id.
pub async fn delete_code(
    State(state): State<AppState>,
    Path(code_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.delete_activation_code(code_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Activation code not found"
        )));
    }

    tracing::info!(code_id = %code_id, "Activation code deleted");

    Ok(StatusCode::NO_CONTENT)
}
