use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use rentora_catalog::Product;

use crate::models::Order;

/// Errors surfaced by the engine's storage collaborators. `RangeConflict`
/// is the typed translation of the store's rental-range exclusion
/// constraint; the engine maps it to `BookingError::DateRangeConflict`.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("rental range conflicts with an existing booking")]
    RangeConflict,

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Product lookup as the engine sees it.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_product_by_id(&self, id: Uuid) -> Result<Option<Product>, LedgerError>;
}

/// The persistent order store. `insert_order` is the authority on the
/// non-overlap invariant: the pre-insert overlap query is advisory, and a
/// concurrent writer losing the race gets `RangeConflict` here.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    async fn insert_order(&self, order: &Order) -> Result<Order, LedgerError>;

    /// Persisted rental orders for `product_id` whose closed interval
    /// intersects `[start, end]`.
    async fn find_overlapping_rentals(
        &self,
        product_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Order>, LedgerError>;

    /// Returns the number of rows removed (0 or 1).
    async fn delete_order_by_id(&self, id: Uuid) -> Result<u64, LedgerError>;

    async fn find_order_by_id(&self, id: Uuid) -> Result<Option<Order>, LedgerError>;
}
