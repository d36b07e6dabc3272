use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use rentora_catalog::{Brand, Category, Product, ProductPatch};
use rentora_core::pagination::{PageParams, Paginated};
use rentora_order::{LedgerError, ProductCatalog};

use crate::error::StoreError;

pub struct CatalogRepository {
    pool: PgPool,
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self {
        Category { id: r.id, name: r.name, created_at: r.created_at, updated_at: r.updated_at }
    }
}

#[derive(sqlx::FromRow)]
struct BrandRow {
    id: Uuid,
    name: String,
    category_id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<BrandRow> for Brand {
    fn from(r: BrandRow) -> Self {
        Brand {
            id: r.id,
            name: r.name,
            category_id: r.category_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    unit_price: i32,
    for_sale: bool,
    for_rent: bool,
    category_id: Uuid,
    brand_id: Uuid,
    owner_id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product {
            id: r.id,
            name: r.name,
            description: r.description,
            unit_price: r.unit_price,
            for_sale: r.for_sale,
            for_rent: r.for_rent,
            category_id: r.category_id,
            brand_id: r.brand_id,
            owner_id: r.owner_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, description, unit_price, for_sale, for_rent, \
                               category_id, brand_id, owner_id, created_at, updated_at";

// ============================================================================
// Filters and query shapes
// ============================================================================

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CategoryFilter {
    pub id: Option<Uuid>,
    pub category_name: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct BrandFilter {
    pub id: Option<Uuid>,
    pub brand_name: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProductFilter {
    pub id: Option<Uuid>,
    pub product_name: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
}

/// Fields for product creation, shared by the API and bulk import.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub unit_price: i32,
    pub for_sale: bool,
    pub for_rent: bool,
    pub category_id: Uuid,
    pub brand_id: Uuid,
    pub owner_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BrandRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub product_name: String,
    pub brand: BrandRef,
}

/// Cross-catalog search results grouped by category name.
#[derive(Debug, Serialize)]
pub struct GroupedSearch {
    pub categories: BTreeMap<String, Vec<SearchHit>>,
    pub total_items: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SearchFilter {
    pub search: Option<String>,
    pub product_name: Option<String>,
    pub category_name: Option<String>,
    pub brand_name: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ItemSummary {
    pub product_id: Uuid,
    pub owner_name: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ItemStats {
    #[serde(flatten)]
    pub product: Product,
    pub total_days: i64,
    pub times_rented: i64,
    pub items_sold: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ItemRefs {
    pub id: Uuid,
    pub product_name: String,
    pub brand_id: Uuid,
    pub category_id: Uuid,
    pub brand_name: String,
    pub category_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

// ============================================================================
// Repository
// ============================================================================

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // -- categories ----------------------------------------------------------

    pub async fn create_category(&self, name: &str) -> Result<Category, StoreError> {
        let row: CategoryRow = sqlx::query_as(
            "INSERT INTO categories (id, name) VALUES ($1, $2)
             RETURNING id, name, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_constraint(e, "category"))?;

        Ok(row.into())
    }

    pub async fn list_categories(
        &self,
        filter: CategoryFilter,
        page: PageParams,
    ) -> Result<Paginated<Category>, StoreError> {
        let apply = |qb: &mut QueryBuilder<Postgres>| {
            if let Some(id) = filter.id {
                qb.push(" AND id = ");
                qb.push_bind(id);
            }
            if let Some(name) = &filter.category_name {
                qb.push(" AND name ILIKE ");
                qb.push_bind(format!("%{name}%"));
            }
        };

        let mut count_qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories WHERE 1=1");
        apply(&mut count_qb);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, name, created_at, updated_at FROM categories WHERE 1=1",
        );
        apply(&mut qb);
        qb.push(" ORDER BY created_at");
        push_page(&mut qb, page);

        let rows: Vec<CategoryRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(Paginated::new(rows.into_iter().map(Into::into).collect(), total, page))
    }

    /// Category names in creation order, for the master-data endpoint.
    pub async fn list_category_names(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM categories ORDER BY created_at")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    // -- brands --------------------------------------------------------------

    pub async fn create_brand(&self, name: &str, category_id: Uuid) -> Result<Brand, StoreError> {
        let row: BrandRow = sqlx::query_as(
            "INSERT INTO brands (id, name, category_id) VALUES ($1, $2, $3)
             RETURNING id, name, category_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_constraint(e, "brand"))?;

        Ok(row.into())
    }

    pub async fn list_brands(
        &self,
        filter: BrandFilter,
        page: PageParams,
    ) -> Result<Paginated<Brand>, StoreError> {
        let apply = |qb: &mut QueryBuilder<Postgres>| {
            if let Some(id) = filter.id {
                qb.push(" AND id = ");
                qb.push_bind(id);
            }
            if let Some(name) = &filter.brand_name {
                qb.push(" AND name ILIKE ");
                qb.push_bind(format!("%{name}%"));
            }
            if let Some(category_id) = filter.category_id {
                qb.push(" AND category_id = ");
                qb.push_bind(category_id);
            }
        };

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM brands WHERE 1=1");
        apply(&mut count_qb);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, name, category_id, created_at, updated_at FROM brands WHERE 1=1",
        );
        apply(&mut qb);
        qb.push(" ORDER BY created_at");
        push_page(&mut qb, page);

        let rows: Vec<BrandRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(Paginated::new(rows.into_iter().map(Into::into).collect(), total, page))
    }

    // -- products ------------------------------------------------------------

    pub async fn create_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO products
               (id, name, description, unit_price, for_sale, for_rent, category_id, brand_id, owner_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.unit_price)
        .bind(new.for_sale)
        .bind(new.for_rent)
        .bind(new.category_id)
        .bind(new.brand_id)
        .bind(new.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_constraint(e, "product"))?;

        Ok(row.into())
    }

    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: PageParams,
    ) -> Result<Paginated<Product>, StoreError> {
        let apply = |qb: &mut QueryBuilder<Postgres>| {
            if let Some(id) = filter.id {
                qb.push(" AND id = ");
                qb.push_bind(id);
            }
            if let Some(name) = &filter.product_name {
                qb.push(" AND name ILIKE ");
                qb.push_bind(format!("%{name}%"));
            }
            if let Some(category_id) = filter.category_id {
                qb.push(" AND category_id = ");
                qb.push_bind(category_id);
            }
            if let Some(brand_id) = filter.brand_id {
                qb.push(" AND brand_id = ");
                qb.push_bind(brand_id);
            }
        };

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products WHERE 1=1");
        apply(&mut count_qb);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE 1=1"
        ));
        apply(&mut qb);
        qb.push(" ORDER BY created_at");
        push_page(&mut qb, page);

        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(Paginated::new(rows.into_iter().map(Into::into).collect(), total, page))
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    pub async fn update_product(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<Product, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE products SET updated_at = NOW()");
        if let Some(name) = &patch.name {
            qb.push(", name = ");
            qb.push_bind(name.clone());
        }
        if let Some(description) = &patch.description {
            qb.push(", description = ");
            qb.push_bind(description.clone());
        }
        if let Some(unit_price) = patch.unit_price {
            qb.push(", unit_price = ");
            qb.push_bind(unit_price);
        }
        if let Some(for_sale) = patch.for_sale {
            qb.push(", for_sale = ");
            qb.push_bind(for_sale);
        }
        if let Some(for_rent) = patch.for_rent {
            qb.push(", for_rent = ");
            qb.push_bind(for_rent);
        }
        if let Some(category_id) = patch.category_id {
            qb.push(", category_id = ");
            qb.push_bind(category_id);
        }
        if let Some(brand_id) = patch.brand_id {
            qb.push(", brand_id = ");
            qb.push_bind(brand_id);
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(format!(" RETURNING {PRODUCT_COLUMNS}"));

        let row: Option<ProductRow> = qb
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::from_constraint(e, "product"))?;

        row.map(Into::into)
            .ok_or_else(|| StoreError::NotFound("product".to_string()))
    }

    /// Hard delete, refused while orders still reference the product. The
    /// foreign key makes the refusal race-free; the violation is reported
    /// as a conflict rather than a dangling reference.
    pub async fn delete_product(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db) = &e {
                    if db.code().as_deref() == Some("23503") {
                        return StoreError::Conflict(
                            "product has outstanding orders".to_string(),
                        );
                    }
                }
                StoreError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("product".to_string()));
        }
        Ok(())
    }

    // -- search --------------------------------------------------------------

    /// Joined search across product, category, and brand names, grouped by
    /// category.
    pub async fn search_all(
        &self,
        filter: SearchFilter,
        page: PageParams,
    ) -> Result<GroupedSearch, StoreError> {
        let apply = |qb: &mut QueryBuilder<Postgres>| {
            if let Some(search) = &filter.search {
                let pattern = format!("%{search}%");
                qb.push(" AND (p.name ILIKE ");
                qb.push_bind(pattern.clone());
                qb.push(" OR c.name ILIKE ");
                qb.push_bind(pattern.clone());
                qb.push(" OR b.name ILIKE ");
                qb.push_bind(pattern);
                qb.push(")");
            }
            if let Some(name) = &filter.product_name {
                qb.push(" AND p.name ILIKE ");
                qb.push_bind(format!("%{name}%"));
            }
            if let Some(name) = &filter.category_name {
                qb.push(" AND c.name ILIKE ");
                qb.push_bind(format!("%{name}%"));
            }
            if let Some(name) = &filter.brand_name {
                qb.push(" AND b.name ILIKE ");
                qb.push_bind(format!("%{name}%"));
            }
        };

        const FROM: &str = " FROM products p
             LEFT JOIN categories c ON p.category_id = c.id
             LEFT JOIN brands b ON p.brand_id = b.id
             WHERE 1=1";

        let mut count_qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(p.id){FROM}"));
        apply(&mut count_qb);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT c.name AS category_name, p.name AS product_name, b.id AS brand_id, b.name AS brand_name{FROM}"
        ));
        apply(&mut qb);
        qb.push(" ORDER BY c.name, p.name");
        push_page(&mut qb, page);

        #[derive(sqlx::FromRow)]
        struct SearchRow {
            category_name: Option<String>,
            product_name: String,
            brand_id: Option<Uuid>,
            brand_name: Option<String>,
        }

        let rows: Vec<SearchRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        let mut categories: BTreeMap<String, Vec<SearchHit>> = BTreeMap::new();
        for row in rows {
            let category = row.category_name.unwrap_or_else(|| "uncategorized".to_string());
            categories.entry(category).or_default().push(SearchHit {
                product_name: row.product_name,
                brand: BrandRef {
                    id: row.brand_id.unwrap_or(Uuid::nil()),
                    name: row.brand_name.unwrap_or_default(),
                },
            });
        }

        let envelope = Paginated::new(Vec::<()>::new(), total, page);
        Ok(GroupedSearch {
            categories,
            total_items: total,
            total_pages: envelope.total_pages,
            current_page: envelope.current_page,
        })
    }

    // -- admin item management -----------------------------------------------

    pub async fn search_items(
        &self,
        id: Option<Uuid>,
        owner_name: Option<&str>,
        sort_by: Option<SortDirection>,
        page: PageParams,
    ) -> Result<Paginated<ItemSummary>, StoreError> {
        let apply = |qb: &mut QueryBuilder<Postgres>| {
            if let Some(id) = id {
                qb.push(" AND p.id = ");
                qb.push_bind(id);
            }
            if let Some(owner) = owner_name {
                qb.push(" AND u.name ILIKE ");
                qb.push_bind(format!("%{owner}%"));
            }
        };

        const FROM: &str = " FROM products p LEFT JOIN users u ON p.owner_id = u.id WHERE 1=1";

        let mut count_qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(p.id){FROM}"));
        apply(&mut count_qb);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT p.id AS product_id, u.name AS owner_name, p.created_at{FROM}"
        ));
        apply(&mut qb);
        match sort_by {
            Some(SortDirection::Desc) => qb.push(" ORDER BY p.created_at DESC"),
            _ => qb.push(" ORDER BY p.created_at ASC"),
        };
        push_page(&mut qb, page);

        let rows: Vec<ItemSummary> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(Paginated::new(rows, total, page))
    }

    /// Product row plus ledger aggregates: rented days, rental count, units
    /// sold.
    pub async fn item_stats(&self, id: Uuid) -> Result<Option<ItemStats>, StoreError> {
        #[derive(sqlx::FromRow)]
        struct StatsRow {
            #[sqlx(flatten)]
            product: ProductRow,
            total_days: i64,
            times_rented: i64,
            items_sold: i64,
        }

        let row: Option<StatsRow> = sqlx::query_as(
            "SELECT p.id, p.name, p.description, p.unit_price, p.for_sale, p.for_rent,
                    p.category_id, p.brand_id, p.owner_id, p.created_at, p.updated_at,
                    COALESCE(SUM(o.total_days) FILTER (WHERE o.order_type = 'rent'), 0)::BIGINT AS total_days,
                    COUNT(o.id) FILTER (WHERE o.order_type = 'rent') AS times_rented,
                    COALESCE(SUM(o.quantity) FILTER (WHERE o.order_type = 'buy'), 0)::BIGINT AS items_sold
             FROM products p
             LEFT JOIN orders o ON o.product_id = p.id
             WHERE p.id = $1
             GROUP BY p.id",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ItemStats {
            product: r.product.into(),
            total_days: r.total_days,
            times_rented: r.times_rented,
            items_sold: r.items_sold,
        }))
    }

    /// Renames the brand and category a product points at, returning the
    /// refreshed joined view.
    pub async fn rename_item_refs(
        &self,
        product_id: Uuid,
        brand_name: Option<&str>,
        category_name: Option<&str>,
    ) -> Result<ItemRefs, StoreError> {
        let mut tx = self.pool.begin().await?;

        let ids: Option<(Uuid, Uuid)> =
            sqlx::query_as("SELECT brand_id, category_id FROM products WHERE id = $1")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (brand_id, category_id) =
            ids.ok_or_else(|| StoreError::NotFound("product".to_string()))?;

        if let Some(name) = brand_name {
            sqlx::query("UPDATE brands SET name = $1, updated_at = NOW() WHERE id = $2")
                .bind(name)
                .bind(brand_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::from_constraint(e, "brand"))?;
        }
        if let Some(name) = category_name {
            sqlx::query("UPDATE categories SET name = $1, updated_at = NOW() WHERE id = $2")
                .bind(name)
                .bind(category_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::from_constraint(e, "category"))?;
        }

        let refs: ItemRefs = sqlx::query_as(
            "SELECT p.id, p.name AS product_name, p.brand_id, p.category_id,
                    b.name AS brand_name, c.name AS category_name
             FROM products p
             JOIN brands b ON p.brand_id = b.id
             JOIN categories c ON p.category_id = c.id
             WHERE p.id = $1",
        )
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(refs)
    }

    // -- bulk import ---------------------------------------------------------

    /// All-or-nothing: one bad row rolls the whole upload back.
    pub async fn bulk_insert_categories(&self, names: &[String]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        for name in names {
            sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2)")
                .bind(Uuid::new_v4())
                .bind(name)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::from_constraint(e, "category"))?;
        }
        tx.commit().await?;
        Ok(names.len() as u64)
    }

    pub async fn bulk_insert_brands(&self, rows: &[(String, Uuid)]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        for (name, category_id) in rows {
            sqlx::query("INSERT INTO brands (id, name, category_id) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(name)
                .bind(category_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::from_constraint(e, "brand"))?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    pub async fn bulk_insert_products(&self, rows: &[NewProduct]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        for new in rows {
            sqlx::query(
                "INSERT INTO products
                   (id, name, description, unit_price, for_sale, for_rent, category_id, brand_id, owner_id)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(Uuid::new_v4())
            .bind(&new.name)
            .bind(&new.description)
            .bind(new.unit_price)
            .bind(new.for_sale)
            .bind(new.for_rent)
            .bind(new.category_id)
            .bind(new.brand_id)
            .bind(new.owner_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::from_constraint(e, "product"))?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }
}

fn push_page(qb: &mut QueryBuilder<Postgres>, page: PageParams) {
    if page.is_paged() {
        qb.push(" LIMIT ");
        qb.push_bind(page.limit.unwrap_or(0));
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());
    }
}

// ============================================================================
// Booking Engine collaborator
// ============================================================================

#[async_trait]
impl ProductCatalog for CatalogRepository {
    async fn find_product_by_id(&self, id: Uuid) -> Result<Option<Product>, LedgerError> {
        self.get_product(id)
            .await
            .map_err(|e| LedgerError::Backend(e.to_string()))
    }
}
