// Storage boundaries consumed by the auth services

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::models::{NewUser, RefreshToken, User};
use crate::persistence::StoreError;

/// User identity store
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_username(&self, user_name: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Create a user with the given password. Policy or uniqueness
    /// violations come back as `StoreError::Rejected`.
    async fn create(&self, user: NewUser, password: &str) -> Result<User, StoreError>;

    async fn check_password(&self, user: &User, password: &str) -> Result<bool, StoreError>;

    async fn get_roles(&self, user: &User) -> Result<Vec<String>, StoreError>;
}

/// Refresh token records, looked up by token value
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, token: &RefreshToken) -> Result<(), StoreError>;

    async fn find(&self, token: &str) -> Result<Option<RefreshToken>, StoreError>;

    /// Atomically flip `used` to true, but only while the record is neither
    /// used nor invalidated. Returns whether this call performed the flip;
    /// of any number of concurrent callers at most one sees `true`.
    async fn mark_used(&self, token: &str) -> Result<bool, StoreError>;

    /// Set `invalidated`. Returns false when no record matches.
    async fn invalidate(&self, token: &str) -> Result<bool, StoreError>;
}
