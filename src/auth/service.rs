// Authentication service - business logic layer

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{
    error::AuthError,
    models::{AuthResponse, NewUser, RefreshTokenState, User},
    store::{RefreshTokenStore, UserStore},
    token::{Claims, TokenService},
};
use crate::persistence::StoreError;

/// Authentication service coordinating login, registration and the refresh
/// token lifecycle
pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            tokens,
        }
    }

    /// Log a user in by email and password.
    ///
    /// An unknown email and a wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            warn!("Login rejected: unknown account");
            return Err(AuthError::AuthenticationFailure(AuthError::INVALID_CREDENTIALS));
        };

        if !self.users.check_password(&user, password).await? {
            warn!("Login rejected: bad password for user {}", user.id);
            return Err(AuthError::AuthenticationFailure(AuthError::INVALID_CREDENTIALS));
        }

        info!("User {} logged in", user.id);
        self.issue_for(&user).await
    }

    /// Create an account and log it in
    pub async fn register(
        &self,
        email: &str,
        user_name: &str,
        password: &str,
    ) -> Result<AuthResponse, AuthError> {
        if self.users.find_by_email(email).await?.is_some()
            || self.users.find_by_username(user_name).await?.is_some()
        {
            warn!("Registration rejected: account already exists");
            return Err(AuthError::AuthenticationFailure(AuthError::ACCOUNT_EXISTS));
        }

        let new_user = NewUser {
            email: email.to_string(),
            user_name: user_name.to_string(),
        };
        let user = match self.users.create(new_user, password).await {
            Ok(user) => user,
            Err(StoreError::Rejected(reason)) => {
                warn!("Registration rejected by user store: {}", reason);
                return Err(AuthError::AuthenticationFailure(AuthError::ACCOUNT_CREATION));
            }
            Err(other) => return Err(other.into()),
        };

        info!("User {} registered", user.id);
        self.issue_for(&user).await
    }

    /// Exchange an expired access token and its paired refresh token for a
    /// new token pair. The refresh token is consumed.
    pub async fn refresh(&self, access_token: &str, refresh_token: &str) -> Result<AuthResponse, AuthError> {
        let claims = self
            .tokens
            .validate_and_extract_claims(access_token)
            .ok_or_else(|| invalid("access token could not be parsed"))?;

        let now = Utc::now();
        if !claims.is_expired_at(now) {
            return Err(invalid("access token has not expired yet"));
        }

        let stored = self
            .refresh_tokens
            .find(refresh_token)
            .await?
            .ok_or_else(|| invalid("refresh token does not exist"))?;

        match stored.state_at(now) {
            RefreshTokenState::Active => {}
            RefreshTokenState::Expired => return Err(invalid("refresh token has expired")),
            RefreshTokenState::Invalidated => return Err(invalid("refresh token has been invalidated")),
            RefreshTokenState::Used => return Err(invalid("refresh token has been used")),
        }

        if stored.jwt_id != claims.jti {
            return Err(invalid("refresh token does not match access token"));
        }
        let user_id = subject(&claims)?;
        if user_id != stored.user_id {
            return Err(invalid("refresh token belongs to another user"));
        }

        // Losing this race means another caller consumed the token first
        if !self.refresh_tokens.mark_used(refresh_token).await? {
            return Err(invalid("refresh token has been used"));
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| invalid("token subject no longer exists"))?;

        info!("Refreshed tokens for user {}", user.id);
        self.issue_for(&user).await
    }

    /// True iff the token parses and has not yet expired
    pub fn validate(&self, token: &str) -> bool {
        self.authenticated_claims(token).is_some()
    }

    /// Claims of a currently valid access token
    pub fn authenticated_claims(&self, token: &str) -> Option<Claims> {
        self.tokens
            .validate_and_extract_claims(token)
            .filter(|claims| !claims.is_expired_at(Utc::now()))
    }

    /// Invalidate a refresh token. Returns false when it is unknown.
    pub async fn revoke(&self, refresh_token: &str) -> Result<bool, AuthError> {
        let revoked = self.refresh_tokens.invalidate(refresh_token).await?;
        if revoked {
            info!("Refresh token revoked");
        } else {
            debug!("Revoke requested for unknown refresh token");
        }
        Ok(revoked)
    }

    async fn issue_for(&self, user: &User) -> Result<AuthResponse, AuthError> {
        let roles = self.users.get_roles(user).await?;
        let mut extra = HashMap::new();
        extra.insert("email".to_string(), serde_json::Value::String(user.email.clone()));

        let pair = self
            .tokens
            .generate_token(user.id, &user.user_name, &roles, extra)
            .await?;

        Ok(AuthResponse {
            token: pair.access_token,
            refresh_token: pair.refresh_token,
            user_id: user.id,
            user_name: user.user_name.clone(),
            email: user.email.clone(),
        })
    }
}

fn invalid(reason: &'static str) -> AuthError {
    warn!("Token rejected: {}", reason);
    AuthError::InvalidToken(reason)
}

fn subject(claims: &Claims) -> Result<Uuid, AuthError> {
    Uuid::parse_str(&claims.sub).map_err(|_| invalid("token subject is not a user id"))
}
