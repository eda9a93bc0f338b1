use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{middleware::AuthenticatedUser, models::Business, AppState};

/// Return the caller's business record, or `null` when onboarding has not
/// created one yet.
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Option<Business>>, AppError> {
    let business = state.db.get_business_by_user(user.user_id).await?;
    Ok(Json(business))
}
