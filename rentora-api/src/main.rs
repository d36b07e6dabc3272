use std::net::SocketAddr;
use std::sync::Arc;

use rentora_api::{app, state::{AppState, AuthConfig}};
use rentora_order::BookingEngine;
use rentora_store::{CatalogRepository, DbClient, OrderRepository, UserRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rentora_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = rentora_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Rentora API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");
    let db = Arc::new(db);

    let users = Arc::new(UserRepository::new(db.pool.clone()));
    let catalog = Arc::new(CatalogRepository::new(db.pool.clone()));
    let orders = Arc::new(OrderRepository::new(db.pool.clone()));
    let booking = Arc::new(BookingEngine::new(catalog.clone(), orders.clone()));

    let app_state = AppState {
        db,
        users,
        catalog,
        orders,
        booking,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        default_page_limit: config.pagination.default_limit,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
