// In-memory stores. Used when no database is configured and as the
// backing stores in tests; they keep the same atomicity guarantees as the
// Postgres implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::auth::{
    models::{NewUser, RefreshToken, User},
    password::PasswordService,
    store::{RefreshTokenStore, UserStore},
};
use crate::persistence::{
    page_offset, token_digest, Page, Repository, StoreError, UnitOfWork, UnitOfWorkFactory,
};
use crate::products::models::{Product, ProductFilter};

// ============================================================================
// Products / unit of work
// ============================================================================

enum Change {
    Insert(Product),
    Update(Product),
    Delete(Uuid),
}

/// Shared product table
#[derive(Default)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<Uuid, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }
}

/// Product repository bound to one unit of work. Reads see committed
/// state; writes are staged until `save_changes`.
pub struct InMemoryProductRepository {
    store: Arc<InMemoryProductStore>,
    pending: Mutex<Vec<Change>>,
}

#[async_trait]
impl Repository<Product, ProductFilter> for InMemoryProductRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.store.products.read().await.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Product>, StoreError> {
        let mut all: Vec<Product> = self.store.products.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn get_paged(
        &self,
        filter: &ProductFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Product>, StoreError> {
        let matching: Vec<Product> = self
            .get_all()
            .await?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();

        let total_count = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page_offset(page, page_size) as usize)
            .take(page_size as usize)
            .collect();

        Ok(Page { items, total_count })
    }

    async fn add(&self, entity: Product) -> Result<Product, StoreError> {
        self.pending.lock().await.push(Change::Insert(entity.clone()));
        Ok(entity)
    }

    async fn update(&self, entity: Product) -> Result<Product, StoreError> {
        self.pending.lock().await.push(Change::Update(entity.clone()));
        Ok(entity)
    }

    async fn delete(&self, entity: &Product) -> Result<(), StoreError> {
        self.pending.lock().await.push(Change::Delete(entity.id));
        Ok(())
    }
}

pub struct InMemoryUnitOfWork {
    products: InMemoryProductRepository,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    fn products(&self) -> &dyn Repository<Product, ProductFilter> {
        &self.products
    }

    /// Applies staged changes all or nothing. An update whose row is gone
    /// fails the whole unit with `RowNotFound`, as the Postgres store does.
    async fn save_changes(&self) -> Result<u64, StoreError> {
        let changes: Vec<Change> = self.products.pending.lock().await.drain(..).collect();
        let mut table = self.products.store.products.write().await;
        let mut staged = table.clone();

        let mut applied = 0;
        for change in changes {
            match change {
                Change::Insert(product) => {
                    staged.insert(product.id, product);
                    applied += 1;
                }
                Change::Update(product) => {
                    let Some(row) = staged.get_mut(&product.id) else {
                        return Err(StoreError::Database(sqlx::Error::RowNotFound));
                    };
                    *row = product;
                    applied += 1;
                }
                Change::Delete(id) => {
                    if staged.remove(&id).is_some() {
                        applied += 1;
                    }
                }
            }
        }

        *table = staged;
        Ok(applied)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUnitOfWorkFactory {
    store: Arc<InMemoryProductStore>,
}

impl InMemoryUnitOfWorkFactory {
    pub fn new(store: Arc<InMemoryProductStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryUnitOfWorkFactory {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        Ok(Box::new(InMemoryUnitOfWork {
            products: InMemoryProductRepository {
                store: self.store.clone(),
                pending: Mutex::new(Vec::new()),
            },
        }))
    }
}

// ============================================================================
// Users
// ============================================================================

struct StoredUser {
    user: User,
    password_hash: String,
    roles: Vec<String>,
}

pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, StoredUser>>,
    passwords: PasswordService,
    default_roles: Vec<String>,
}

impl InMemoryUserStore {
    pub fn new(passwords: PasswordService) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            passwords,
            default_roles: Vec::new(),
        }
    }

    /// Roles granted to every newly created user
    pub fn with_default_roles(mut self, roles: Vec<String>) -> Self {
        self.default_roles = roles;
        self
    }

    async fn find_where(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        self.users
            .read()
            .await
            .values()
            .find(|stored| pred(&stored.user))
            .map(|stored| stored.user.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.find_where(|u| u.email.eq_ignore_ascii_case(email)).await)
    }

    async fn find_by_username(&self, user_name: &str) -> Result<Option<User>, StoreError> {
        Ok(self.find_where(|u| u.user_name.eq_ignore_ascii_case(user_name)).await)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).map(|stored| stored.user.clone()))
    }

    async fn create(&self, user: NewUser, password: &str) -> Result<User, StoreError> {
        PasswordService::validate_password_strength(password).map_err(StoreError::Rejected)?;

        let password_hash = self
            .passwords
            .hash_password(password)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        let mut users = self.users.write().await;
        let taken = users.values().any(|stored| {
            stored.user.email.eq_ignore_ascii_case(&user.email)
                || stored.user.user_name.eq_ignore_ascii_case(&user.user_name)
        });
        if taken {
            return Err(StoreError::Rejected("email or user name already in use".to_string()));
        }

        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            user_name: user.user_name,
            created_at: Utc::now(),
        };
        users.insert(
            created.id,
            StoredUser {
                user: created.clone(),
                password_hash,
                roles: self.default_roles.clone(),
            },
        );
        Ok(created)
    }

    async fn check_password(&self, user: &User, password: &str) -> Result<bool, StoreError> {
        let hash = match self.users.read().await.get(&user.id) {
            Some(stored) => stored.password_hash.clone(),
            None => return Ok(false),
        };
        self.passwords
            .verify_password(password, &hash)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))
    }

    async fn get_roles(&self, user: &User) -> Result<Vec<String>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .get(&user.id)
            .map(|stored| stored.roles.clone())
            .unwrap_or_default())
    }
}

// ============================================================================
// Refresh tokens
// ============================================================================

/// Records keyed by the digest of the token value. A single mutex guards
/// the map so check-and-set in `mark_used` is atomic.
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: Mutex<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn insert(&self, token: &RefreshToken) -> Result<(), StoreError> {
        let mut tokens = self.tokens.lock().await;
        let key = token_digest(&token.token);
        if tokens.contains_key(&key) {
            return Err(StoreError::Rejected("duplicate refresh token".to_string()));
        }
        tokens.insert(key, token.clone());
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshToken>, StoreError> {
        Ok(self.tokens.lock().await.get(&token_digest(token)).cloned())
    }

    async fn mark_used(&self, token: &str) -> Result<bool, StoreError> {
        let mut tokens = self.tokens.lock().await;
        match tokens.get_mut(&token_digest(token)) {
            Some(record) if !record.used && !record.invalidated => {
                record.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn invalidate(&self, token: &str) -> Result<bool, StoreError> {
        let mut tokens = self.tokens.lock().await;
        match tokens.get_mut(&token_digest(token)) {
            Some(record) => {
                record.invalidated = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
