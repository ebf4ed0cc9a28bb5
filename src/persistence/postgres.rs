use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use tokio::sync::Mutex;
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

/// Type alias for the PostgreSQL connection pool
pub type DbPool = PgPool;

/// Creates and configures a PostgreSQL connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    tracing::debug!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}

/// Run the embedded SQL migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

// ============================================================================
// Unit of work
// ============================================================================

type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, image_url, in_stock, is_new, created_at";

/// Product repository executing inside the unit's transaction
pub struct PgProductRepository {
    tx: SharedTx,
    writes: Arc<AtomicU64>,
}

#[async_trait]
impl Repository<Product, ProductFilter> for PgProductRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::Completed)?;

        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(product)
    }

    async fn get_all(&self) -> Result<Vec<Product>, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::Completed)?;

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products ORDER BY created_at, id",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&mut **tx)
        .await?;

        Ok(products)
    }

    async fn get_paged(
        &self,
        filter: &ProductFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Product>, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::Completed)?;

        // NULL parameters disable their filter
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));
        let predicate = "($1::TEXT IS NULL OR name ILIKE $1 OR description ILIKE $1) \
             AND ($2::BOOLEAN IS NULL OR in_stock = $2) \
             AND ($3::BOOLEAN IS NULL OR is_new = $3)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products WHERE {}", predicate))
            .bind(&search)
            .bind(filter.in_stock)
            .bind(filter.is_new)
            .fetch_one(&mut **tx)
            .await?;

        let items = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE {} ORDER BY created_at, id LIMIT $4 OFFSET $5",
            PRODUCT_COLUMNS, predicate
        ))
        .bind(&search)
        .bind(filter.in_stock)
        .bind(filter.is_new)
        .bind(i64::from(page_size))
        .bind(page_offset(page, page_size) as i64)
        .fetch_all(&mut **tx)
        .await?;

        Ok(Page {
            items,
            total_count: total.max(0) as u64,
        })
    }

    async fn add(&self, entity: Product) -> Result<Product, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::Completed)?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (id, name, description, price, image_url, in_stock, is_new, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(entity.id)
        .bind(&entity.name)
        .bind(&entity.description)
        .bind(entity.price)
        .bind(&entity.image_url)
        .bind(entity.in_stock)
        .bind(entity.is_new)
        .bind(entity.created_at)
        .fetch_one(&mut **tx)
        .await?;

        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(product)
    }

    async fn update(&self, entity: Product) -> Result<Product, StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::Completed)?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, image_url = $5, in_stock = $6, is_new = $7
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(entity.id)
        .bind(&entity.name)
        .bind(&entity.description)
        .bind(entity.price)
        .bind(&entity.image_url)
        .bind(entity.in_stock)
        .bind(entity.is_new)
        .fetch_one(&mut **tx)
        .await?;

        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(product)
    }

    async fn delete(&self, entity: &Product) -> Result<(), StoreError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(StoreError::Completed)?;

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(entity.id)
            .execute(&mut **tx)
            .await?;

        self.writes.fetch_add(result.rows_affected(), Ordering::Relaxed);
        Ok(())
    }
}

/// One database transaction. Rolled back when dropped without
/// `save_changes`.
pub struct PgUnitOfWork {
    tx: SharedTx,
    writes: Arc<AtomicU64>,
    products: PgProductRepository,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    fn products(&self) -> &dyn Repository<Product, ProductFilter> {
        &self.products
    }

    async fn save_changes(&self) -> Result<u64, StoreError> {
        let tx = self.tx.lock().await.take().ok_or(StoreError::Completed)?;
        tx.commit().await?;
        Ok(self.writes.swap(0, Ordering::Relaxed))
    }
}

#[derive(Clone)]
pub struct PgUnitOfWorkFactory {
    pool: PgPool,
}

impl PgUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWorkFactory for PgUnitOfWorkFactory {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx: SharedTx = Arc::new(Mutex::new(Some(self.pool.begin().await?)));
        let writes = Arc::new(AtomicU64::new(0));
        Ok(Box::new(PgUnitOfWork {
            tx: tx.clone(),
            writes: writes.clone(),
            products: PgProductRepository { tx, writes },
        }))
    }
}

// ============================================================================
// Users
// ============================================================================

pub struct PgUserStore {
    pool: PgPool,
    passwords: PasswordService,
    default_roles: Vec<String>,
}

impl PgUserStore {
    pub fn new(pool: PgPool, passwords: PasswordService) -> Self {
        Self {
            pool,
            passwords,
            default_roles: Vec::new(),
        }
    }

    /// Roles granted to every newly created user
    pub fn with_default_roles(mut self, roles: Vec<String>) -> Self {
        self.default_roles = roles;
        self
    }
}

const USER_COLUMNS: &str = "id, email, user_name, created_at";

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_username(&self, user_name: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(user_name) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn create(&self, user: NewUser, password: &str) -> Result<User, StoreError> {
        PasswordService::validate_password_strength(password).map_err(StoreError::Rejected)?;

        let password_hash = self
            .passwords
            .hash_password(password)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, user_name, password_hash) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.user_name)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            // Check for unique constraint violation
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return StoreError::Rejected("email or user name already in use".to_string());
                }
            }
            StoreError::Database(e)
        })?;

        for role in &self.default_roles {
            sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
                .bind(created.id)
                .bind(role)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn check_password(&self, user: &User, password: &str) -> Result<bool, StoreError> {
        let hash: Option<String> = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_optional(&self.pool)
            .await?;

        match hash {
            Some(hash) => self
                .passwords
                .verify_password(password, &hash)
                .await
                .map_err(|e| StoreError::Internal(e.to_string())),
            None => Ok(false),
        }
    }

    async fn get_roles(&self, user: &User) -> Result<Vec<String>, StoreError> {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role",
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }
}

// ============================================================================
// Refresh tokens
// ============================================================================

#[derive(FromRow)]
struct RefreshTokenRow {
    jwt_id: String,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    used: bool,
    invalidated: bool,
}

impl RefreshTokenRow {
    fn into_record(self, token: &str) -> RefreshToken {
        RefreshToken {
            token: token.to_string(),
            jwt_id: self.jwt_id,
            user_id: self.user_id,
            created_at: self.created_at,
            expires_at: self.expires_at,
            used: self.used,
            invalidated: self.invalidated,
        }
    }
}

/// Refresh token records; only the SHA-256 digest of each value is stored
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn insert(&self, token: &RefreshToken) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, jwt_id, user_id, created_at, expires_at, used, invalidated)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token_digest(&token.token))
        .bind(&token.jwt_id)
        .bind(token.user_id)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(token.used)
        .bind(token.invalidated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshToken>, StoreError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT jwt_id, user_id, created_at, expires_at, used, invalidated
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_digest(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_record(token)))
    }

    async fn mark_used(&self, token: &str) -> Result<bool, StoreError> {
        // Conditional update: concurrent callers race on the row lock and
        // only the first sees used = FALSE
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET used = TRUE
            WHERE token_hash = $1 AND used = FALSE AND invalidated = FALSE
            "#,
        )
        .bind(token_digest(token))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn invalidate(&self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE refresh_tokens SET invalidated = TRUE WHERE token_hash = $1")
            .bind(token_digest(token))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
