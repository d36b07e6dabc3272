use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use rentora_core::pagination::{PageParams, Paginated};
use rentora_order::{LedgerError, Order, OrderLedger, OrderType};

use crate::catalog_repo::SortDirection;
use crate::error::StoreError;

pub struct OrderRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    product_id: Uuid,
    user_id: Uuid,
    order_type: String,
    quantity: i32,
    unit_price: i32,
    total_cost: i32,
    order_date: DateTime<Utc>,
    per_day: Option<i32>,
    rent_start: Option<NaiveDate>,
    rent_end: Option<NaiveDate>,
    total_days: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, String> {
        Ok(Order {
            id: self.id,
            product_id: self.product_id,
            user_id: self.user_id,
            order_type: self.order_type.parse()?,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_cost: self.total_cost,
            order_date: self.order_date,
            per_day: self.per_day,
            rent_start: self.rent_start,
            rent_end: self.rent_end,
            total_days: self.total_days,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, product_id, user_id, order_type, quantity, unit_price, \
                             total_cost, order_date, per_day, rent_start, rent_end, \
                             total_days, created_at, updated_at";

// ============================================================================
// Query shapes
// ============================================================================

/// Per-type order listing row; rental fields only appear on rent orders.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderListing {
    pub id: Uuid,
    pub user_name: Option<String>,
    pub product_name: Option<String>,
    pub order_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_end: Option<NaiveDate>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderHistoryRow {
    pub id: Uuid,
    pub user_name: Option<String>,
    pub order_type: String,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: i32,
    pub total_cost: i32,
    pub order_date: DateTime<Utc>,
}

/// Admin order detail: both parties of the transaction.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub unit_price: i32,
    pub quantity: i32,
    pub total_cost: i32,
    pub order_type: String,
    pub renter_name: Option<String>,
    pub renter_email: Option<String>,
    pub lender_name: Option<String>,
    pub lender_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_end: Option<NaiveDate>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderAdminRow {
    pub id: Uuid,
    pub order_date: DateTime<Utc>,
    pub product_id: Uuid,
    pub order_type: String,
    pub product_name: Option<String>,
    pub renter_name: Option<String>,
    pub lender_name: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct OrderSearchParams {
    pub id: Option<Uuid>,
    pub renter_name: Option<String>,
    pub lender_name: Option<String>,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub order_type: Option<String>,
    pub sort_by: Option<SortDirection>,
}

// ============================================================================
// Repository
// ============================================================================

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn orders_by_type(
        &self,
        order_type: OrderType,
        page: PageParams,
    ) -> Result<Paginated<OrderListing>, StoreError> {
        self.listing(order_type, None, page).await
    }

    pub async fn my_orders(
        &self,
        user_id: Uuid,
        order_type: OrderType,
        page: PageParams,
    ) -> Result<Paginated<OrderListing>, StoreError> {
        self.listing(order_type, Some(user_id), page).await
    }

    async fn listing(
        &self,
        order_type: OrderType,
        user_id: Option<Uuid>,
        page: PageParams,
    ) -> Result<Paginated<OrderListing>, StoreError> {
        let apply = |qb: &mut QueryBuilder<Postgres>| {
            qb.push(" AND o.order_type = ");
            qb.push_bind(order_type.as_str());
            if let Some(user_id) = user_id {
                qb.push(" AND o.user_id = ");
                qb.push_bind(user_id);
            }
        };

        const FROM: &str = " FROM orders o
             LEFT JOIN users u ON o.user_id = u.id
             LEFT JOIN products p ON o.product_id = p.id
             WHERE 1=1";

        let mut count_qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(o.id){FROM}"));
        apply(&mut count_qb);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT o.id, u.name AS user_name, p.name AS product_name, o.order_date,
                    o.rent_start, o.rent_end{FROM}"
        ));
        apply(&mut qb);
        qb.push(" ORDER BY o.order_date DESC");
        push_page(&mut qb, page);

        let rows: Vec<OrderListing> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(Paginated::new(rows, total, page))
    }

    pub async fn list_orders(
        &self,
        id: Option<Uuid>,
        user_id: Option<Uuid>,
        page: PageParams,
    ) -> Result<Paginated<OrderHistoryRow>, StoreError> {
        let apply = |qb: &mut QueryBuilder<Postgres>| {
            if let Some(id) = id {
                qb.push(" AND o.id = ");
                qb.push_bind(id);
            }
            if let Some(user_id) = user_id {
                qb.push(" AND u.id = ");
                qb.push_bind(user_id);
            }
        };

        const FROM: &str = " FROM orders o
             LEFT JOIN users u ON o.user_id = u.id
             LEFT JOIN products p ON o.product_id = p.id
             WHERE 1=1";

        let mut count_qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(o.id){FROM}"));
        apply(&mut count_qb);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT o.id, u.name AS user_name, o.order_type, p.name AS product_name,
                    o.quantity, o.unit_price, o.total_cost, o.order_date{FROM}"
        ));
        apply(&mut qb);
        qb.push(" ORDER BY o.order_date DESC");
        push_page(&mut qb, page);

        let rows: Vec<OrderHistoryRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(Paginated::new(rows, total, page))
    }

    pub async fn order_detail(&self, id: Uuid) -> Result<Option<OrderDetail>, StoreError> {
        let row: Option<OrderDetail> = sqlx::query_as(
            "SELECT o.id, o.product_id, o.unit_price, o.quantity, o.total_cost, o.order_type,
                    r.name AS renter_name, r.email AS renter_email,
                    l.name AS lender_name, l.email AS lender_email,
                    o.rent_start, o.rent_end
             FROM orders o
             LEFT JOIN users r ON o.user_id = r.id
             LEFT JOIN products p ON o.product_id = p.id
             LEFT JOIN users l ON p.owner_id = l.id
             WHERE o.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn search_orders(
        &self,
        params: OrderSearchParams,
        page: PageParams,
    ) -> Result<Paginated<OrderAdminRow>, StoreError> {
        let apply = |qb: &mut QueryBuilder<Postgres>| {
            if let Some(id) = params.id {
                qb.push(" AND o.id = ");
                qb.push_bind(id);
            }
            if let Some(product_id) = params.product_id {
                qb.push(" AND o.product_id = ");
                qb.push_bind(product_id);
            }
            if let Some(name) = &params.product_name {
                qb.push(" AND p.name ILIKE ");
                qb.push_bind(format!("%{name}%"));
            }
            if let Some(name) = &params.renter_name {
                qb.push(" AND r.name ILIKE ");
                qb.push_bind(format!("%{name}%"));
            }
            if let Some(name) = &params.lender_name {
                qb.push(" AND l.name ILIKE ");
                qb.push_bind(format!("%{name}%"));
            }
            if let Some(order_type) = &params.order_type {
                qb.push(" AND o.order_type = ");
                qb.push_bind(order_type.clone());
            }
        };

        const FROM: &str = " FROM orders o
             LEFT JOIN products p ON o.product_id = p.id
             LEFT JOIN users r ON o.user_id = r.id
             LEFT JOIN users l ON p.owner_id = l.id
             WHERE 1=1";

        let mut count_qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(o.id){FROM}"));
        apply(&mut count_qb);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT o.id, o.order_date, o.product_id, o.order_type,
                    p.name AS product_name, r.name AS renter_name, l.name AS lender_name{FROM}"
        ));
        apply(&mut qb);
        match params.sort_by {
            Some(SortDirection::Desc) => qb.push(" ORDER BY o.order_date DESC"),
            _ => qb.push(" ORDER BY o.order_date ASC"),
        };
        push_page(&mut qb, page);

        let rows: Vec<OrderAdminRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(Paginated::new(rows, total, page))
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

/// SQLSTATE for exclusion-constraint violations.
const EXCLUSION_VIOLATION: &str = "23P01";

fn ledger_err(err: sqlx::Error) -> LedgerError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(EXCLUSION_VIOLATION) {
            return LedgerError::RangeConflict;
        }
    }
    LedgerError::Backend(err.to_string())
}

#[async_trait]
impl OrderLedger for OrderRepository {
    /// The `orders_no_rental_overlap` exclusion constraint is the authority
    /// on the non-overlap invariant; a violation comes back as
    /// `RangeConflict` regardless of what any earlier advisory query saw.
    async fn insert_order(&self, order: &Order) -> Result<Order, LedgerError> {
        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders
               (id, product_id, user_id, order_type, quantity, unit_price, total_cost,
                order_date, per_day, rent_start, rent_end, total_days)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.id)
        .bind(order.product_id)
        .bind(order.user_id)
        .bind(order.order_type.as_str())
        .bind(order.quantity)
        .bind(order.unit_price)
        .bind(order.total_cost)
        .bind(order.order_date)
        .bind(order.per_day)
        .bind(order.rent_start)
        .bind(order.rent_end)
        .bind(order.total_days)
        .fetch_one(&self.pool)
        .await
        .map_err(ledger_err)?;

        row.into_order().map_err(LedgerError::Backend)
    }

    async fn find_overlapping_rentals(
        &self,
        product_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Order>, LedgerError> {
        // Closed-interval overlap: existing.start <= end AND start <= existing.end
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE product_id = $1
               AND order_type = 'rent'
               AND rent_start <= $3
               AND rent_end >= $2",
        ))
        .bind(product_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(ledger_err)?;

        rows.into_iter()
            .map(|r| r.into_order().map_err(LedgerError::Backend))
            .collect()
    }

    async fn delete_order_by_id(&self, id: Uuid) -> Result<u64, LedgerError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ledger_err)?;
        Ok(result.rows_affected())
    }

    async fn find_order_by_id(&self, id: Uuid) -> Result<Option<Order>, LedgerError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ledger_err)?;

        row.map(|r| r.into_order().map_err(LedgerError::Backend))
            .transpose()
    }
}
