// HTTP endpoints for the /Auth group

use axum::{extract::State, Json};
use validator::Validate;

use crate::app::{request_scope, AppState};
use crate::auth::{
    commands::{RefreshTokenCommand, RevokeTokenCommand, UserLoginCommand, UserRegisterCommand},
    middleware::AuthenticatedUser,
    models::AuthResponse,
};
use crate::error::ApiError;
use crate::response::ApiResponse;

/// Handler for POST /Auth/login
#[utoipa::path(
    post,
    path = "/Auth/login",
    request_body = UserLoginCommand,
    responses(
        (status = 200, description = "Logged on", body = AuthResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many requests")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(command): Json<UserLoginCommand>,
) -> Result<ApiResponse<AuthResponse>, ApiError> {
    command.validate()?;

    let (ct, _guard) = request_scope();
    state.sender.send(command, ct).await
}

/// Handler for POST /Auth/register
#[utoipa::path(
    post,
    path = "/Auth/register",
    request_body = UserRegisterCommand,
    responses(
        (status = 200, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Account already exists"),
        (status = 429, description = "Too many requests")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(command): Json<UserRegisterCommand>,
) -> Result<ApiResponse<AuthResponse>, ApiError> {
    command.validate()?;

    let (ct, _guard) = request_scope();
    state.sender.send(command, ct).await
}

/// Handler for POST /Auth/refresh
#[utoipa::path(
    post,
    path = "/Auth/refresh",
    request_body = RefreshTokenCommand,
    responses(
        (status = 200, description = "New token pair", body = AuthResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Invalid token"),
        (status = 429, description = "Too many requests")
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(command): Json<RefreshTokenCommand>,
) -> Result<ApiResponse<AuthResponse>, ApiError> {
    command.validate()?;

    let (ct, _guard) = request_scope();
    state.sender.send(command, ct).await
}

/// Handler for POST /Auth/revoke
#[utoipa::path(
    post,
    path = "/Auth/revoke",
    request_body = RevokeTokenCommand,
    responses(
        (status = 200, description = "Refresh token revoked", body = bool),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Refresh token not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn revoke(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(command): Json<RevokeTokenCommand>,
) -> Result<ApiResponse<bool>, ApiError> {
    tracing::debug!("User {} revoking a refresh token", user.user_id);
    command.validate()?;

    let (ct, _guard) = request_scope();
    state.sender.send(command, ct).await
}
