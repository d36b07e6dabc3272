use std::collections::HashMap;
use std::io::Cursor;

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use calamine::{Data, Reader, Xlsx};
use serde::Serialize;
use uuid::Uuid;

use rentora_store::catalog_repo::NewProduct;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub imported: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/imports/categories", post(upload_categories))
        .route("/imports/brands", post(upload_brands))
        .route("/imports/products", post(upload_products))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /imports/categories — .xlsx with a `name` column
async fn upload_categories(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportSummary>, AppError> {
    let bytes = first_file(&mut multipart).await?;
    let (headers, rows) = sheet_rows(&bytes)?;
    let names = parse_category_rows(&headers, &rows)?;

    let imported = state.catalog.bulk_insert_categories(&names).await?;
    tracing::info!(imported, "category import committed");
    Ok(Json(ImportSummary { imported }))
}

/// POST /imports/brands — .xlsx with `name` and `category_id` columns
async fn upload_brands(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportSummary>, AppError> {
    let bytes = first_file(&mut multipart).await?;
    let (headers, rows) = sheet_rows(&bytes)?;
    let brands = parse_brand_rows(&headers, &rows)?;

    let imported = state.catalog.bulk_insert_brands(&brands).await?;
    tracing::info!(imported, "brand import committed");
    Ok(Json(ImportSummary { imported }))
}

/// POST /imports/products — .xlsx with the full product column set
async fn upload_products(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportSummary>, AppError> {
    let bytes = first_file(&mut multipart).await?;
    let (headers, rows) = sheet_rows(&bytes)?;
    let products = parse_product_rows(&headers, &rows)?;

    let imported = state.catalog.bulk_insert_products(&products).await?;
    tracing::info!(imported, "product import committed");
    Ok(Json(ImportSummary { imported }))
}

// ============================================================================
// Workbook handling
// ============================================================================

async fn first_file(multipart: &mut Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("invalid multipart body: {e}")))?
    {
        if field.file_name().is_some() || field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::ValidationError(format!("failed to read upload: {e}")))?;
            return Ok(bytes.to_vec());
        }
    }
    Err(AppError::ValidationError("No file uploaded".to_string()))
}

/// First worksheet as a lowercased header row plus data rows.
fn sheet_rows(bytes: &[u8]) -> Result<(Vec<String>, Vec<Vec<Data>>), AppError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| AppError::ValidationError(format!("unreadable workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::ValidationError("workbook has no sheets".to_string()))?
        .map_err(|e| AppError::ValidationError(format!("unreadable sheet: {e}")))?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .ok_or_else(|| AppError::ValidationError("sheet is empty".to_string()))?
        .iter()
        .map(|cell| cell.to_string().trim().to_lowercase())
        .collect();
    let data = rows.map(|row| row.to_vec()).collect();

    Ok((headers, data))
}

fn header_index(headers: &[String], column: &str) -> Result<usize, AppError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| AppError::ValidationError(format!("missing column: {column}")))
}

fn cell<'a>(row: &'a [Data], idx: usize) -> &'a Data {
    row.get(idx).unwrap_or(&Data::Empty)
}

fn cell_string(data: &Data) -> Option<String> {
    match data {
        Data::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

fn cell_i32(data: &Data) -> Option<i32> {
    match data {
        Data::Int(i) => i32::try_from(*i).ok(),
        Data::Float(f) => Some(*f as i32),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn cell_bool(data: &Data) -> Option<bool> {
    match data {
        Data::Bool(b) => Some(*b),
        Data::Int(i) => Some(*i != 0),
        Data::Float(f) => Some(*f != 0.0),
        Data::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn cell_uuid(data: &Data) -> Option<Uuid> {
    match data {
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Row parsers
// ============================================================================

fn parse_category_rows(headers: &[String], rows: &[Vec<Data>]) -> Result<Vec<String>, AppError> {
    let name_idx = header_index(headers, "name")?;

    let mut names = Vec::with_capacity(rows.len());
    for (line, row) in rows.iter().enumerate() {
        let name = cell_string(cell(row, name_idx))
            .ok_or_else(|| AppError::ValidationError(format!("row {}: missing name", line + 2)))?;
        names.push(name);
    }
    Ok(names)
}

fn parse_brand_rows(
    headers: &[String],
    rows: &[Vec<Data>],
) -> Result<Vec<(String, Uuid)>, AppError> {
    let name_idx = header_index(headers, "name")?;
    let category_idx = header_index(headers, "category_id")?;

    let mut brands = Vec::with_capacity(rows.len());
    for (line, row) in rows.iter().enumerate() {
        let name = cell_string(cell(row, name_idx))
            .ok_or_else(|| AppError::ValidationError(format!("row {}: missing name", line + 2)))?;
        let category_id = cell_uuid(cell(row, category_idx)).ok_or_else(|| {
            AppError::ValidationError(format!("row {}: bad category_id", line + 2))
        })?;
        brands.push((name, category_id));
    }
    Ok(brands)
}

fn parse_product_rows(
    headers: &[String],
    rows: &[Vec<Data>],
) -> Result<Vec<NewProduct>, AppError> {
    let name_idx = header_index(headers, "name")?;
    let description_idx = headers.iter().position(|h| h == "description");
    let price_idx = header_index(headers, "unit_price")?;
    let for_sale_idx = header_index(headers, "for_sale")?;
    let for_rent_idx = header_index(headers, "for_rent")?;
    let category_idx = header_index(headers, "category_id")?;
    let brand_idx = header_index(headers, "brand_id")?;
    let owner_idx = header_index(headers, "owner_id")?;

    let mut products = Vec::with_capacity(rows.len());
    for (line, row) in rows.iter().enumerate() {
        let bad = |what: &str| {
            AppError::ValidationError(format!("row {}: bad {what}", line + 2))
        };
        products.push(NewProduct {
            name: cell_string(cell(row, name_idx)).ok_or_else(|| bad("name"))?,
            description: description_idx.and_then(|idx| cell_string(cell(row, idx))),
            unit_price: cell_i32(cell(row, price_idx)).ok_or_else(|| bad("unit_price"))?,
            for_sale: cell_bool(cell(row, for_sale_idx)).ok_or_else(|| bad("for_sale"))?,
            for_rent: cell_bool(cell(row, for_rent_idx)).ok_or_else(|| bad("for_rent"))?,
            category_id: cell_uuid(cell(row, category_idx)).ok_or_else(|| bad("category_id"))?,
            brand_id: cell_uuid(cell(row, brand_idx)).ok_or_else(|| bad("brand_id"))?,
            owner_id: cell_uuid(cell(row, owner_idx)).ok_or_else(|| bad("owner_id"))?,
        });
    }
    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn category_rows_require_a_name() {
        let h = headers(&["name"]);
        let rows = vec![vec![Data::String("Jackets".to_string())], vec![Data::Empty]];
        assert!(parse_category_rows(&h, &rows[..1]).is_ok());
        assert!(parse_category_rows(&h, &rows).is_err());
    }

    #[test]
    fn brand_rows_parse_uuid_references() {
        let category = Uuid::new_v4();
        let h = headers(&["name", "category_id"]);
        let rows = vec![vec![
            Data::String("Northwind".to_string()),
            Data::String(category.to_string()),
        ]];
        let brands = parse_brand_rows(&h, &rows).unwrap();
        assert_eq!(brands, vec![("Northwind".to_string(), category)]);
    }

    #[test]
    fn product_rows_map_all_columns() {
        let (category, brand, owner) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let h = headers(&[
            "name", "description", "unit_price", "for_sale", "for_rent",
            "category_id", "brand_id", "owner_id",
        ]);
        let rows = vec![vec![
            Data::String("Canvas Tent".to_string()),
            Data::String("4-person".to_string()),
            Data::Int(240),
            Data::Bool(true),
            Data::String("yes".to_string()),
            Data::String(category.to_string()),
            Data::String(brand.to_string()),
            Data::String(owner.to_string()),
        ]];

        let products = parse_product_rows(&h, &rows).unwrap();
        assert_eq!(products.len(), 1);
        let p = &products[0];
        assert_eq!(p.name, "Canvas Tent");
        assert_eq!(p.unit_price, 240);
        assert!(p.for_sale);
        assert!(p.for_rent);
        assert_eq!(p.owner_id, owner);
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let h = headers(&["name"]);
        let err = parse_brand_rows(&h, &[]).unwrap_err();
        let msg = format!("{err:?}");
        assert!(msg.contains("category_id"));
    }
}
