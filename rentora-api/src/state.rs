use std::sync::Arc;

use rentora_order::BookingEngine;
use rentora_store::{CatalogRepository, DbClient, OrderRepository, UserRepository};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbClient>,
    pub users: Arc<UserRepository>,
    pub catalog: Arc<CatalogRepository>,
    pub orders: Arc<OrderRepository>,
    pub booking: Arc<BookingEngine>,
    pub auth: AuthConfig,
    pub default_page_limit: i64,
}
