use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use rentora_catalog::{validation, Brand, Category, Product, ProductPatch};
use rentora_core::identity::UserRole;
use rentora_core::pagination::{PageParams, Paginated};
use rentora_store::catalog_repo::{
    BrandFilter, CategoryFilter, GroupedSearch, NewProduct, ProductFilter, SearchFilter,
};

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBrandRequest {
    pub name: String,
    pub category_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub unit_price: i32,
    #[serde(default)]
    pub for_sale: bool,
    #[serde(default)]
    pub for_rent: bool,
    pub category_id: Uuid,
    pub brand_id: Uuid,
    /// Defaults to the authenticated caller.
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub id: Option<Uuid>,
    pub category_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BrandQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub id: Option<Uuid>,
    pub brand_name: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub id: Option<Uuid>,
    pub product_name: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub search: Option<String>,
    pub product_name: Option<String>,
    pub category_name: Option<String>,
    pub brand_name: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", post(create_category).get(list_categories))
        .route("/brands", post(create_brand).get(list_brands))
        .route("/products", post(create_product).get(list_products))
        .route("/products/{id}", put(edit_product).delete(delete_product))
        .route("/search", get(search_all))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /categories
async fn create_category(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    claims.authorize(&[UserRole::Admin, UserRole::Lender, UserRole::Renter])?;
    validation::validate_name("category name", &req.name)?;

    let category = state.catalog.create_category(req.name.trim()).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// POST /brands
async fn create_brand(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<CreateBrandRequest>,
) -> Result<(StatusCode, Json<Brand>), AppError> {
    claims.authorize(&[UserRole::Lender, UserRole::Renter])?;
    validation::validate_name("brand name", &req.name)?;

    let brand = state.catalog.create_brand(req.name.trim(), req.category_id).await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

/// POST /products
async fn create_product(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    claims.authorize(&[UserRole::Lender, UserRole::Renter])?;
    validation::validate_name("product name", &req.name)?;
    validation::validate_price(req.unit_price)?;

    let product = state
        .catalog
        .create_product(NewProduct {
            name: req.name.trim().to_string(),
            description: req.description,
            unit_price: req.unit_price,
            for_sale: req.for_sale,
            for_rent: req.for_rent,
            category_id: req.category_id,
            brand_id: req.brand_id,
            owner_id: req.owner_id.unwrap_or(claims.sub),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /categories
async fn list_categories(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Paginated<Category>>, AppError> {
    claims.authorize(&[UserRole::Lender, UserRole::Renter])?;

    let page = PageParams { limit: query.limit, page: query.page }
        .with_default_limit(state.default_page_limit);
    let filter = CategoryFilter { id: query.id, category_name: query.category_name };
    Ok(Json(state.catalog.list_categories(filter, page).await?))
}

/// GET /brands
async fn list_brands(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<BrandQuery>,
) -> Result<Json<Paginated<Brand>>, AppError> {
    claims.authorize(&[UserRole::Lender, UserRole::Renter])?;

    let page = PageParams { limit: query.limit, page: query.page }
        .with_default_limit(state.default_page_limit);
    let filter = BrandFilter {
        id: query.id,
        brand_name: query.brand_name,
        category_id: query.category_id,
    };
    Ok(Json(state.catalog.list_brands(filter, page).await?))
}

/// GET /products
async fn list_products(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Paginated<Product>>, AppError> {
    claims.authorize(&[UserRole::Lender, UserRole::Renter])?;

    let page = PageParams { limit: query.limit, page: query.page }
        .with_default_limit(state.default_page_limit);
    let filter = ProductFilter {
        id: query.id,
        product_name: query.product_name,
        category_id: query.category_id,
        brand_id: query.brand_id,
    };
    Ok(Json(state.catalog.list_products(filter, page).await?))
}

/// PUT /products/{id}
async fn edit_product(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<Uuid>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>, AppError> {
    claims.authorize(&[UserRole::Lender, UserRole::Renter])?;

    if patch.is_empty() {
        return Err(AppError::ValidationError("nothing to update".to_string()));
    }
    if let Some(name) = &patch.name {
        validation::validate_name("product name", name)?;
    }
    if let Some(price) = patch.unit_price {
        validation::validate_price(price)?;
    }

    Ok(Json(state.catalog.update_product(id, patch).await?))
}

/// DELETE /products/{id}
///
/// Refused with 409 while orders still reference the product; there is no
/// cascade and no tombstone.
async fn delete_product(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    claims.authorize(&[UserRole::Admin, UserRole::Lender, UserRole::Renter])?;

    state.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /search
async fn search_all(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<SearchQuery>,
) -> Result<Json<GroupedSearch>, AppError> {
    claims.authorize(&[UserRole::Lender, UserRole::Renter])?;

    let page = PageParams { limit: query.limit, page: query.page }
        .with_default_limit(state.default_page_limit);
    let filter = SearchFilter {
        search: query.search,
        product_name: query.product_name,
        category_name: query.category_name,
        brand_name: query.brand_name,
    };
    Ok(Json(state.catalog.search_all(filter, page).await?))
}
