// Authentication data models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// User identity record (password hash excluded)
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

/// Data needed to create a user; the password travels separately
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub user_name: String,
}

/// Server-side refresh token record. Records are never deleted; a used or
/// invalidated record stays as an audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshToken {
    /// Opaque token value handed to the client
    pub token: String,
    /// `jti` of the access token issued alongside this refresh token
    pub jwt_id: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub invalidated: bool,
}

/// Lifecycle state derived from a refresh token record at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    Used,
    Invalidated,
    Expired,
}

impl RefreshToken {
    pub fn state_at(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.invalidated {
            RefreshTokenState::Invalidated
        } else if self.used {
            RefreshTokenState::Used
        } else if now > self.expires_at {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == RefreshTokenState::Active
    }
}

/// Output of access token generation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Authentication response returned by login, register and refresh
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(used: bool, invalidated: bool, expires_in: Duration) -> RefreshToken {
        let now = Utc::now();
        RefreshToken {
            token: "value".to_string(),
            jwt_id: "jti".to_string(),
            user_id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + expires_in,
            used,
            invalidated,
        }
    }

    #[test]
    fn test_refresh_token_states() {
        let now = Utc::now();
        assert_eq!(record(false, false, Duration::days(1)).state_at(now), RefreshTokenState::Active);
        assert_eq!(record(true, false, Duration::days(1)).state_at(now), RefreshTokenState::Used);
        assert_eq!(record(false, true, Duration::days(1)).state_at(now), RefreshTokenState::Invalidated);
        assert_eq!(record(false, false, Duration::days(-1)).state_at(now), RefreshTokenState::Expired);
    }

    #[test]
    fn test_only_active_tokens_are_active() {
        let now = Utc::now();
        assert!(record(false, false, Duration::days(1)).is_active_at(now));
        assert!(!record(true, true, Duration::days(-1)).is_active_at(now));
    }

    #[test]
    fn test_auth_response_uses_camel_case() {
        let response = AuthResponse {
            token: "t".to_string(),
            refresh_token: "r".to_string(),
            user_id: Uuid::nil(),
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["refreshToken"], "r");
        assert_eq!(json["userName"], "alice");
        assert!(json.get("userId").is_some());
    }
}
