use std::net::SocketAddr;

use catalog_api::{
    auth::password::PasswordService,
    build_state, create_router,
    persistence::postgres::{create_pool, run_migrations},
    AppConfig, Stores,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Catalog API - Starting...");

    let config = AppConfig::from_env().expect("Invalid configuration");

    let stores = match config.database_url.as_deref() {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = create_pool(database_url, config.database_max_connections)
                .await
                .expect("Failed to create database pool");

            tracing::info!("Running database migrations...");
            run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Migrations completed successfully");

            Stores::postgres(pool, PasswordService::default())
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            Stores::in_memory(PasswordService::default())
        }
    };

    let state = build_state(stores, config.jwt.clone()).expect("Failed to register request handlers");
    let app = create_router(state, &config.rate_limit).expect("Invalid rate limit configuration");

    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Catalog API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("Server error");
}
