// Authentication extractor for protected routes

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::{debug, warn};

use crate::app::AppState;
use crate::auth::error::AuthError;
use crate::error::ApiError;

/// Caller identity taken from a valid bearer access token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub user_name: String,
    pub roles: Vec<String>,
}

/// Pull the token out of an `Authorization: Bearer <token>` header
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let endpoint = parts.uri.path().to_string();

        let Some(token) = bearer_token(parts) else {
            warn!("Missing or malformed bearer token for endpoint: {}", endpoint);
            return Err(AuthError::InvalidToken("missing bearer token").into());
        };

        let claims = state.auth.authenticated_claims(token).ok_or_else(|| {
            warn!("Rejected bearer token for endpoint: {}", endpoint);
            ApiError::from(AuthError::InvalidToken("bearer token is not valid"))
        })?;

        debug!("Authenticated user {} for {}", claims.sub, endpoint);
        Ok(AuthenticatedUser {
            user_id: claims.sub,
            user_name: claims.name,
            roles: claims.roles,
        })
    }
}
