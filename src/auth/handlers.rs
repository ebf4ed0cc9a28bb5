// Request handlers for authentication commands

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::auth::{
    commands::{RefreshTokenCommand, RevokeTokenCommand, UserLoginCommand, UserRegisterCommand},
    models::AuthResponse,
    service::AuthService,
};
use crate::error::ApiError;
use crate::mediator::{until_cancelled, RequestHandler};
use crate::response::ApiResponse;

pub const REFRESH_TOKEN_NOT_FOUND: &str = "Refresh token not found";

pub struct UserLoginHandler {
    auth: Arc<AuthService>,
}

impl UserLoginHandler {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl RequestHandler<UserLoginCommand> for UserLoginHandler {
    async fn handle(
        &self,
        request: UserLoginCommand,
        ct: CancellationToken,
    ) -> Result<ApiResponse<AuthResponse>, ApiError> {
        until_cancelled(&ct, async {
            let result = self.auth.login(&request.email, &request.password).await?;
            Ok(ApiResponse::success(Some(result), "Logged On Successfully"))
        })
        .await
    }
}

pub struct UserRegisterHandler {
    auth: Arc<AuthService>,
}

impl UserRegisterHandler {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl RequestHandler<UserRegisterCommand> for UserRegisterHandler {
    async fn handle(
        &self,
        request: UserRegisterCommand,
        ct: CancellationToken,
    ) -> Result<ApiResponse<AuthResponse>, ApiError> {
        until_cancelled(&ct, async {
            let result = self
                .auth
                .register(&request.email, &request.user_name, &request.password)
                .await?;
            Ok(ApiResponse::success(Some(result), "Account Created Successfully"))
        })
        .await
    }
}

pub struct RefreshTokenHandler {
    auth: Arc<AuthService>,
}

impl RefreshTokenHandler {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl RequestHandler<RefreshTokenCommand> for RefreshTokenHandler {
    async fn handle(
        &self,
        request: RefreshTokenCommand,
        ct: CancellationToken,
    ) -> Result<ApiResponse<AuthResponse>, ApiError> {
        until_cancelled(&ct, async {
            let result = self.auth.refresh(&request.token, &request.refresh_token).await?;
            Ok(ApiResponse::success(Some(result), "Token Refreshed Successfully"))
        })
        .await
    }
}

pub struct RevokeTokenHandler {
    auth: Arc<AuthService>,
}

impl RevokeTokenHandler {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl RequestHandler<RevokeTokenCommand> for RevokeTokenHandler {
    async fn handle(
        &self,
        request: RevokeTokenCommand,
        ct: CancellationToken,
    ) -> Result<ApiResponse<bool>, ApiError> {
        until_cancelled(&ct, async {
            if self.auth.revoke(&request.refresh_token).await? {
                Ok(ApiResponse::success(Some(true), "Token Revoked Successfully"))
            } else {
                Ok(ApiResponse::not_found(REFRESH_TOKEN_NOT_FOUND))
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::PasswordService;
    use crate::auth::token::{tests::test_settings, TokenService};
    use crate::persistence::memory::{InMemoryRefreshTokenStore, InMemoryUserStore};
    use axum::http::StatusCode;
    use chrono::Duration;

    fn auth_service() -> Arc<AuthService> {
        let users = Arc::new(InMemoryUserStore::new(PasswordService::with_params(8, 1, 1).unwrap()));
        let refresh_tokens = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = Arc::new(TokenService::new(test_settings(Duration::minutes(5)), refresh_tokens.clone()));
        Arc::new(AuthService::new(users, refresh_tokens, tokens))
    }

    fn register_command() -> UserRegisterCommand {
        UserRegisterCommand {
            email: "grace@example.com".to_string(),
            user_name: "grace".to_string(),
            password: "hopper123".to_string(),
            confirm_password: "hopper123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_login_messages() {
        let auth = auth_service();

        let registered = UserRegisterHandler::new(auth.clone())
            .handle(register_command(), CancellationToken::new())
            .await
            .unwrap();
        assert!(registered.success);
        assert_eq!(registered.message, "Account Created Successfully");

        let logged_in = UserLoginHandler::new(auth)
            .handle(
                UserLoginCommand {
                    email: "grace@example.com".to_string(),
                    password: "hopper123".to_string(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(logged_in.message, "Logged On Successfully");
        assert_eq!(logged_in.data.unwrap().user_name, "grace");
    }

    #[tokio::test]
    async fn test_bad_login_is_auth_error() {
        let auth = auth_service();
        let err = UserLoginHandler::new(auth)
            .handle(
                UserLoginCommand {
                    email: "nobody@example.com".to_string(),
                    password: "whatever1".to_string(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_revoke_known_and_unknown() {
        let auth = auth_service();
        let registered = UserRegisterHandler::new(auth.clone())
            .handle(register_command(), CancellationToken::new())
            .await
            .unwrap()
            .data
            .unwrap();
        let handler = RevokeTokenHandler::new(auth);

        let revoked = handler
            .handle(
                RevokeTokenCommand {
                    refresh_token: registered.refresh_token,
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(revoked.data, Some(true));

        let unknown = handler
            .handle(
                RevokeTokenCommand {
                    refresh_token: "missing".to_string(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(!unknown.success);
        assert_eq!(unknown.message, REFRESH_TOKEN_NOT_FOUND);
    }
}
