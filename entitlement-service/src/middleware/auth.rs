//! Bearer-token authentication.
//!
//! The identity provider issues HS256 JWTs; this service only verifies them
//! and extracts the stable user id from the `sub` claim.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use crate::startup::AppState;

/// Claims this service cares about; anything else in the token is ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// The authenticated caller, extracted from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Verify a bearer token against the shared secret.
pub fn verify_bearer(headers: &HeaderMap, jwt_secret: &str) -> Result<AuthenticatedUser, AppError> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing bearer token")))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing bearer token")))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;

    let user_id = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::AuthError(anyhow::anyhow!("Token subject is not a user id")))?;

    Ok(AuthenticatedUser { user_id })
}

/// Best-effort identity for endpoints where an anonymous caller is a valid
/// state rather than an error.
pub fn maybe_user(headers: &HeaderMap, jwt_secret: &str) -> Option<AuthenticatedUser> {
    verify_bearer(headers, jwt_secret).ok()
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = verify_bearer(
            &parts.headers,
            state.config.auth.jwt_secret.expose_secret(),
        )?;

        tracing::Span::current().record("user_id", user.user_id.to_string());

        Ok(user)
    }
}
