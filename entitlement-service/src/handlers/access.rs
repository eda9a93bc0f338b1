//! Access gate for protected routes.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use crate::{
    domain::{access, evaluator},
    middleware::auth,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    #[serde(default = "default_route")]
    pub route: String,
}

fn default_route() -> String {
    "/".to_string()
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub route: String,
    pub decision: access::AccessDecision,
}

/// Decide whether the caller may navigate to a route. An absent or invalid
/// bearer token is a regular outcome here (redirect to auth), not a 401.
pub async fn check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AccessQuery>,
) -> Result<Json<AccessResponse>, AppError> {
    let jwt_secret = state.config.auth.jwt_secret.expose_secret();

    let decision = match auth::maybe_user(&headers, jwt_secret) {
        None => access::decide(false, false, false, &query.route),
        Some(user) => match state.db.get_business_by_user(user.user_id).await? {
            None => access::decide(true, false, false, &query.route),
            Some(business) => {
                let subscription = state.db.latest_subscription(business.id).await?;
                let is_active = evaluator::is_active(subscription.as_ref(), Utc::now());
                access::decide(true, true, is_active, &query.route)
            }
        },
    };

    tracing::debug!(route = %query.route, decision = ?decision, "Access check");

    Ok(Json(AccessResponse {
        route: query.route,
        decision,
    }))
}
