use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rentora_core::pagination::{PageParams, Paginated};
use rentora_store::catalog_repo::{ItemRefs, ItemStats, ItemSummary, SortDirection};
use rentora_store::order_repo::{OrderAdminRow, OrderDetail, OrderSearchParams};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ItemSearchQuery {
    pub id: Option<Uuid>,
    pub owner_name: Option<String>,
    pub sort_by: Option<SortDirection>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OrderSearchQuery {
    pub id: Option<Uuid>,
    pub renter_name: Option<String>,
    pub lender_name: Option<String>,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub order_type: Option<String>,
    pub sort_by: Option<SortDirection>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RenameItemRequest {
    pub brand_name: Option<String>,
    pub category_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MasterDataQuery {
    pub position_a: usize,
    pub position_b: usize,
}

#[derive(Debug, Serialize)]
pub struct MasterDataResponse {
    pub category_names: Vec<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(search_items))
        .route("/items/{id}", get(item_stats).put(rename_item))
        .route("/orders", get(search_orders))
        .route("/orders/{id}", get(order_detail))
        .route("/master-data", get(master_data))
}

// Role gating happens in the admin auth middleware; every handler here is
// admin-only.

// ============================================================================
// Handlers
// ============================================================================

/// GET /admin/items
async fn search_items(
    State(state): State<AppState>,
    Query(query): Query<ItemSearchQuery>,
) -> Result<Json<Paginated<ItemSummary>>, AppError> {
    let page = PageParams { limit: query.limit, page: query.page }
        .with_default_limit(state.default_page_limit);
    let items = state
        .catalog
        .search_items(query.id, query.owner_name.as_deref(), query.sort_by, page)
        .await?;
    Ok(Json(items))
}

/// GET /admin/items/{id}
async fn item_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemStats>, AppError> {
    let stats = state
        .catalog
        .item_stats(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("product not found".to_string()))?;
    Ok(Json(stats))
}

/// PUT /admin/items/{id}
async fn rename_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenameItemRequest>,
) -> Result<Json<ItemRefs>, AppError> {
    if req.brand_name.is_none() && req.category_name.is_none() {
        return Err(AppError::ValidationError("nothing to rename".to_string()));
    }
    let refs = state
        .catalog
        .rename_item_refs(id, req.brand_name.as_deref(), req.category_name.as_deref())
        .await?;
    Ok(Json(refs))
}

/// GET /admin/orders
async fn search_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderSearchQuery>,
) -> Result<Json<Paginated<OrderAdminRow>>, AppError> {
    if let Some(order_type) = &query.order_type {
        if order_type != "buy" && order_type != "rent" {
            return Err(AppError::ValidationError("Invalid orderType".to_string()));
        }
    }

    let page = PageParams { limit: query.limit, page: query.page }
        .with_default_limit(state.default_page_limit);
    let params = OrderSearchParams {
        id: query.id,
        renter_name: query.renter_name,
        lender_name: query.lender_name,
        product_id: query.product_id,
        product_name: query.product_name,
        order_type: query.order_type,
        sort_by: query.sort_by,
    };
    Ok(Json(state.orders.search_orders(params, page).await?))
}

/// GET /admin/orders/{id}
async fn order_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>, AppError> {
    let detail = state
        .orders
        .order_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("order not found".to_string()))?;
    Ok(Json(detail))
}

/// GET /admin/master-data?position_a=..&position_b=..
async fn master_data(
    State(state): State<AppState>,
    Query(query): Query<MasterDataQuery>,
) -> Result<Json<MasterDataResponse>, AppError> {
    let mut names = state.catalog.list_category_names().await?;
    swap_positions(&mut names, query.position_a, query.position_b)?;
    Ok(Json(MasterDataResponse { category_names: names }))
}

fn swap_positions(names: &mut [String], a: usize, b: usize) -> Result<(), AppError> {
    if a >= names.len() || b >= names.len() {
        return Err(AppError::ValidationError("Invalid positions".to_string()));
    }
    names.swap(a, b);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_rejects_out_of_range_positions() {
        let mut names = vec!["jackets".to_string(), "shoes".to_string()];
        assert!(swap_positions(&mut names, 0, 2).is_err());
        assert_eq!(names, vec!["jackets".to_string(), "shoes".to_string()]);
    }

    #[test]
    fn swap_exchanges_the_two_entries() {
        let mut names = vec!["jackets".to_string(), "shoes".to_string(), "bags".to_string()];
        swap_positions(&mut names, 0, 2).unwrap();
        assert_eq!(names, vec!["bags".to_string(), "shoes".to_string(), "jackets".to_string()]);
    }
}
