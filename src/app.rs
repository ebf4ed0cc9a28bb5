// Application assembly: stores, handler registration and the router

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use tokio_util::sync::{CancellationToken, DropGuard};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{
    self,
    commands::{RefreshTokenCommand, RevokeTokenCommand, UserLoginCommand, UserRegisterCommand},
    handlers::{RefreshTokenHandler, RevokeTokenHandler, UserLoginHandler, UserRegisterHandler},
    models::AuthResponse,
    password::PasswordService,
    AuthService, RefreshTokenStore, TokenService, UserStore,
};
use crate::config::{ConfigError, JwtSettings, RateLimitSettings};
use crate::mediator::{HandlerRegistry, RegistryError, RequestSender};
use crate::persistence::{
    memory::{InMemoryProductStore, InMemoryRefreshTokenStore, InMemoryUnitOfWorkFactory, InMemoryUserStore},
    postgres::{PgRefreshTokenStore, PgUnitOfWorkFactory, PgUserStore},
    UnitOfWorkFactory,
};
use crate::products::{
    self,
    commands::{
        AddProductCommand, DeleteProductCommand, GetAllProductsRequest, GetProductByIdRequest,
        ToggleInStockProductCommand, UpdateProductCommand,
    },
    handlers::{
        AddProductHandler, DeleteProductHandler, GetAllProductsHandler, GetProductByIdHandler,
        ToggleInStockProductHandler, UpdateProductHandler,
    },
    models::ProductResponse,
};

/// Role granted to every newly registered account
pub const DEFAULT_ROLE: &str = "User";

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::endpoints::login,
        auth::endpoints::register,
        auth::endpoints::refresh,
        auth::endpoints::revoke,
        products::endpoints::add_product,
        products::endpoints::update_product,
        products::endpoints::delete_product,
        products::endpoints::toggle_in_stock,
        products::endpoints::get_all_products,
        products::endpoints::get_product_by_id,
    ),
    components(
        schemas(
            UserLoginCommand,
            UserRegisterCommand,
            RefreshTokenCommand,
            RevokeTokenCommand,
            AuthResponse,
            AddProductCommand,
            UpdateProductCommand,
            DeleteProductCommand,
            ToggleInStockProductCommand,
            ProductResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, registration and token lifecycle"),
        (name = "Products", description = "Product catalog management endpoints")
    ),
    info(
        title = "Catalog API",
        version = "1.0.0",
        description = "Product catalog with JWT authentication"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across endpoints
#[derive(Clone)]
pub struct AppState {
    pub sender: Arc<RequestSender>,
    pub auth: Arc<AuthService>,
}

/// The storage backends the application runs on
pub struct Stores {
    pub products: Arc<dyn UnitOfWorkFactory>,
    pub users: Arc<dyn UserStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
}

impl Stores {
    pub fn in_memory(passwords: PasswordService) -> Self {
        Self {
            products: Arc::new(InMemoryUnitOfWorkFactory::new(Arc::new(InMemoryProductStore::new()))),
            users: Arc::new(InMemoryUserStore::new(passwords).with_default_roles(vec![DEFAULT_ROLE.to_string()])),
            refresh_tokens: Arc::new(InMemoryRefreshTokenStore::new()),
        }
    }

    pub fn postgres(pool: PgPool, passwords: PasswordService) -> Self {
        Self {
            products: Arc::new(PgUnitOfWorkFactory::new(pool.clone())),
            users: Arc::new(PgUserStore::new(pool.clone(), passwords).with_default_roles(vec![DEFAULT_ROLE.to_string()])),
            refresh_tokens: Arc::new(PgRefreshTokenStore::new(pool)),
        }
    }
}

/// Register the one handler for every request type the API dispatches
pub fn register_handlers(
    registry: &mut HandlerRegistry,
    products: Arc<dyn UnitOfWorkFactory>,
    auth: Arc<AuthService>,
) -> Result<(), RegistryError> {
    registry
        .register::<AddProductCommand, _>(AddProductHandler::new(products.clone()))?
        .register::<UpdateProductCommand, _>(UpdateProductHandler::new(products.clone()))?
        .register::<DeleteProductCommand, _>(DeleteProductHandler::new(products.clone()))?
        .register::<ToggleInStockProductCommand, _>(ToggleInStockProductHandler::new(products.clone()))?
        .register::<GetProductByIdRequest, _>(GetProductByIdHandler::new(products.clone()))?
        .register::<GetAllProductsRequest, _>(GetAllProductsHandler::new(products))?
        .register::<UserLoginCommand, _>(UserLoginHandler::new(auth.clone()))?
        .register::<UserRegisterCommand, _>(UserRegisterHandler::new(auth.clone()))?
        .register::<RefreshTokenCommand, _>(RefreshTokenHandler::new(auth.clone()))?
        .register::<RevokeTokenCommand, _>(RevokeTokenHandler::new(auth))?;

    tracing::info!("Registered {} request handlers", registry.len());
    Ok(())
}

/// Wire services and the dispatcher over the given stores
pub fn build_state(stores: Stores, jwt: JwtSettings) -> Result<AppState, RegistryError> {
    let tokens = Arc::new(TokenService::new(jwt, stores.refresh_tokens.clone()));
    let auth = Arc::new(AuthService::new(stores.users, stores.refresh_tokens, tokens));

    let mut registry = HandlerRegistry::new();
    register_handlers(&mut registry, stores.products, auth.clone())?;

    Ok(AppState {
        sender: Arc::new(RequestSender::new(registry)),
        auth,
    })
}

/// Cancellation scope for one HTTP request. The token fires when the guard
/// is dropped, which happens when axum drops the endpoint future because
/// the client went away.
pub fn request_scope() -> (CancellationToken, DropGuard) {
    let ct = CancellationToken::new();
    let guard = ct.clone().drop_guard();
    (ct, guard)
}

/// Creates and configures the application router
///
/// The per-IP limiter keys on the peer address, so the server must be
/// started with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_router(state: AppState, rate_limit: &RateLimitSettings) -> Result<Router, ConfigError> {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut auth_routes = Router::new()
        .route("/Auth/login", post(auth::endpoints::login))
        .route("/Auth/register", post(auth::endpoints::register))
        .route("/Auth/refresh", post(auth::endpoints::refresh))
        .route("/Auth/revoke", post(auth::endpoints::revoke));

    if rate_limit.enabled {
        let governor = GovernorConfigBuilder::default()
            .per_second(rate_limit.replenish_seconds)
            .burst_size(rate_limit.burst_size)
            .finish()
            .ok_or(ConfigError::InvalidValue("RATE_LIMIT_REPLENISH_SECONDS"))?;

        tracing::info!(
            "Rate limiting /Auth: burst {}, one permit every {}s",
            rate_limit.burst_size,
            rate_limit.replenish_seconds
        );
        auth_routes = auth_routes.layer(GovernorLayer {
            config: Box::leak(Box::new(governor)),
        });
    }

    let product_routes = Router::new()
        .route("/Products/add-product", post(products::endpoints::add_product))
        .route("/Products/update-product", put(products::endpoints::update_product))
        .route("/Products/delete-product", delete(products::endpoints::delete_product))
        .route("/Products/toggle-in-stock", put(products::endpoints::toggle_in_stock))
        .route("/Products/get-all", get(products::endpoints::get_all_products))
        .route("/Products/:id", get(products::endpoints::get_product_by_id));

    Ok(Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(auth_routes)
        .merge(product_routes)
        .layer(cors)
        .with_state(state))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::token::tests::test_settings;
    use chrono::Duration;

    /// In-memory application state with cheap password hashing
    pub(crate) fn test_state(token_lifetime: Duration) -> AppState {
        let passwords = PasswordService::with_params(8, 1, 1).unwrap();
        build_state(Stores::in_memory(passwords), test_settings(token_lifetime)).unwrap()
    }

    #[test]
    fn test_every_request_type_has_a_handler() {
        let state = test_state(Duration::minutes(5));
        let registry = state.sender.registry();

        assert_eq!(registry.len(), 10);
        assert!(registry.contains::<AddProductCommand>());
        assert!(registry.contains::<UpdateProductCommand>());
        assert!(registry.contains::<DeleteProductCommand>());
        assert!(registry.contains::<ToggleInStockProductCommand>());
        assert!(registry.contains::<GetProductByIdRequest>());
        assert!(registry.contains::<GetAllProductsRequest>());
        assert!(registry.contains::<UserLoginCommand>());
        assert!(registry.contains::<UserRegisterCommand>());
        assert!(registry.contains::<RefreshTokenCommand>());
        assert!(registry.contains::<RevokeTokenCommand>());
    }

    #[test]
    fn test_registering_twice_fails() {
        let state = test_state(Duration::minutes(5));
        let products: Arc<dyn UnitOfWorkFactory> =
            Arc::new(InMemoryUnitOfWorkFactory::new(Arc::new(InMemoryProductStore::new())));

        let mut registry = HandlerRegistry::new();
        register_handlers(&mut registry, products.clone(), state.auth.clone()).unwrap();
        let err = register_handlers(&mut registry, products, state.auth).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateHandler { .. }));
    }

    #[test]
    fn test_request_scope_cancels_on_drop() {
        let (ct, guard) = request_scope();
        assert!(!ct.is_cancelled());
        drop(guard);
        assert!(ct.is_cancelled());
    }

    #[test]
    fn test_invalid_rate_limit_is_config_error() {
        let settings = RateLimitSettings {
            enabled: true,
            replenish_seconds: 0,
            burst_size: 10,
        };
        let err = create_router(test_state(Duration::minutes(5)), &settings).err().unwrap();
        assert!(matches!(err, ConfigError::InvalidValue("RATE_LIMIT_REPLENISH_SECONDS")));
    }

    #[tokio::test]
    async fn test_auth_routes_are_rate_limited_per_peer() {
        use axum::{body::Body, extract::ConnectInfo, http::Request, http::StatusCode};
        use std::net::SocketAddr;
        use tower::ServiceExt;

        let settings = RateLimitSettings {
            enabled: true,
            replenish_seconds: 60,
            burst_size: 2,
        };
        let app = create_router(test_state(Duration::minutes(5)), &settings).unwrap();
        let peer: SocketAddr = "203.0.113.7:40000".parse().unwrap();

        let mut statuses = Vec::new();
        for _ in 0..3 {
            let request = Request::post("/Auth/login")
                .header("content-type", "application/json")
                .extension(ConnectInfo(peer))
                .body(Body::from(r#"{"email":"nobody@example.com","password":"whatever1"}"#))
                .unwrap();
            statuses.push(app.clone().oneshot(request).await.unwrap().status());
        }

        assert_eq!(statuses[0], StatusCode::UNAUTHORIZED);
        assert_eq!(statuses[1], StatusCode::UNAUTHORIZED);
        assert_eq!(statuses[2], StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/Auth/login",
            "/Auth/register",
            "/Auth/refresh",
            "/Auth/revoke",
            "/Products/add-product",
            "/Products/update-product",
            "/Products/delete-product",
            "/Products/toggle-in-stock",
            "/Products/get-all",
            "/Products/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
