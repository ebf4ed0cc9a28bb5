// Persistence boundary: repository and unit-of-work abstractions plus the
// Postgres and in-memory backends that implement them

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::products::models::{Product, ProductFilter};

/// Storage failures. These are never expected business outcomes and are
/// surfaced to clients as a generic internal error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store refused a write (uniqueness or policy violation)
    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Unit of work already completed")]
    Completed,

    #[error("Store internal error: {0}")]
    Internal(String),
}

/// One page of results plus the total number of matching rows
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

/// Generic repository over one entity type `T`, filtered by `F`
#[async_trait]
pub trait Repository<T, F>: Send + Sync
where
    T: Send + Sync,
    F: Send + Sync,
{
    async fn get_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError>;

    async fn get_all(&self) -> Result<Vec<T>, StoreError>;

    /// `page` is 1-based
    async fn get_paged(&self, filter: &F, page: u32, page_size: u32) -> Result<Page<T>, StoreError>;

    async fn add(&self, entity: T) -> Result<T, StoreError>;

    async fn update(&self, entity: T) -> Result<T, StoreError>;

    async fn delete(&self, entity: &T) -> Result<(), StoreError>;
}

/// A set of repository writes committed together by `save_changes`.
/// Dropping a unit without saving discards its writes.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn products(&self) -> &dyn Repository<Product, ProductFilter>;

    /// Commit pending writes and return how many were applied
    async fn save_changes(&self) -> Result<u64, StoreError>;
}

/// Hands out a fresh unit of work per handler invocation
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}

/// SHA-256 digest of an opaque token, hex encoded. Refresh tokens are only
/// ever stored in this form.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Number of rows to skip for a 1-based page
pub(crate) fn page_offset(page: u32, page_size: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_digest_is_stable_and_hex() {
        let a = token_digest("refresh-value");
        let b = token_digest("refresh-value");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, token_digest("other-value"));
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
        assert_eq!(page_offset(0, 10), 0);
    }
}
