use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use volunteer_hub::auth::{TokenService, UserRepository};
use volunteer_hub::categories::CategoryRepository;
use volunteer_hub::config::AppConfig;
use volunteer_hub::requests::RequestRepository;
use volunteer_hub::{create_router, db, geo, AppState};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Volunteer Hub - Starting...");

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let geocoder = geo::geocoder::from_config(&config.geocoder, config.geocoder_timeout)
        .expect("Failed to build geocoding client");

    let state = AppState::new(
        Arc::new(TokenService::from_config(&config.jwt)),
        config.default_radius_km,
        Arc::new(UserRepository::new(db_pool.clone())),
        Arc::new(CategoryRepository::new(db_pool.clone())),
        Arc::new(RequestRepository::new(db_pool)),
        geocoder,
    );
    let app = create_router(state, config.cors_allowed_origins.as_deref());

    // Start the Axum server
    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Volunteer Hub is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}
