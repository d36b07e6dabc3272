use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use rentora_core::identity::UserRole;
use rentora_core::pagination::{PageParams, Paginated};
use rentora_order::booking::OrderStatusView;
use rentora_order::{Order, OrderType, RentalRequest, SaleRequest};
use rentora_store::order_repo::{OrderHistoryRow, OrderListing};

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SaleBody {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct RentalBody {
    pub product_id: Uuid,
    pub quantity: i32,
    pub rent_start: NaiveDate,
    pub rent_end: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ByTypeQuery {
    pub order_type: String,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders/sale", post(create_sale))
        .route("/orders/rent", post(create_rental))
        .route("/orders/by-type", get(orders_by_type))
        .route("/orders/mine", get(my_orders))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", delete(delete_order))
        .route("/orders/{id}/status", get(order_status))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /orders/sale
async fn create_sale(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<SaleBody>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    claims.authorize(&[UserRole::Lender, UserRole::Renter])?;

    let order = state
        .booking
        .place_sale_order(SaleRequest {
            product_id: body.product_id,
            user_id: claims.sub,
            quantity: body.quantity,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// POST /orders/rent
async fn create_rental(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<RentalBody>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    claims.authorize(&[UserRole::Lender, UserRole::Renter])?;

    let order = state
        .booking
        .place_rental_order(RentalRequest {
            product_id: body.product_id,
            user_id: claims.sub,
            quantity: body.quantity,
            rent_start: body.rent_start,
            rent_end: body.rent_end,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// DELETE /orders/{id}
async fn delete_order(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    claims.authorize(&[UserRole::Admin, UserRole::Lender, UserRole::Renter])?;

    state.booking.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /orders/{id}/status
async fn order_status(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderStatusView>, AppError> {
    claims.authorize(&[UserRole::Lender, UserRole::Renter])?;

    Ok(Json(state.booking.order_status(id).await?))
}

/// GET /orders/by-type?order_type=buy|rent
async fn orders_by_type(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<ByTypeQuery>,
) -> Result<Json<Paginated<OrderListing>>, AppError> {
    claims.authorize(&[UserRole::Lender, UserRole::Renter])?;

    let order_type = parse_order_type(&query.order_type)?;
    let page = PageParams { limit: query.limit, page: query.page }
        .with_default_limit(state.default_page_limit);
    Ok(Json(state.orders.orders_by_type(order_type, page).await?))
}

/// GET /orders/mine?order_type=buy|rent
async fn my_orders(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<ByTypeQuery>,
) -> Result<Json<Paginated<OrderListing>>, AppError> {
    claims.authorize(&[UserRole::Lender, UserRole::Renter])?;

    let order_type = parse_order_type(&query.order_type)?;
    let page = PageParams { limit: query.limit, page: query.page }
        .with_default_limit(state.default_page_limit);
    Ok(Json(state.orders.my_orders(claims.sub, order_type, page).await?))
}

/// GET /orders
async fn list_orders(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Paginated<OrderHistoryRow>>, AppError> {
    claims.authorize(&[UserRole::Lender, UserRole::Renter])?;

    let page = PageParams { limit: query.limit, page: query.page }
        .with_default_limit(state.default_page_limit);
    Ok(Json(state.orders.list_orders(query.id, query.user_id, page).await?))
}

fn parse_order_type(raw: &str) -> Result<OrderType, AppError> {
    raw.parse()
        .map_err(|_| AppError::ValidationError("Invalid orderType".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_type_parsing() {
        assert_eq!(parse_order_type("buy").unwrap(), OrderType::Buy);
        assert_eq!(parse_order_type("rent").unwrap(), OrderType::Rent);
        assert!(parse_order_type("lease").is_err());
    }
}
