use uuid::Uuid;

use crate::ledger::LedgerError;

/// Typed outcomes of the Booking Engine. Everything except `Storage` is
/// deterministic and caller-recoverable; `Storage` is surfaced as-is and
/// never retried here.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Product is already booked for an overlapping date range")]
    DateRangeConflict,

    #[error("Product is not available for sale")]
    NotAvailableForSale,

    #[error("Product is not available for rent")]
    NotAvailableForRent,

    #[error("Invalid rental date range")]
    InvalidDateRange,

    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error("Storage failure: {0}")]
    Storage(LedgerError),
}

impl From<LedgerError> for BookingError {
    fn from(err: LedgerError) -> Self {
        match err {
            // A constraint rejection from the store is the same fact as a
            // failed overlap pre-check, just observed later.
            LedgerError::RangeConflict => BookingError::DateRangeConflict,
            other => BookingError::Storage(other),
        }
    }
}

impl BookingError {
    /// Deterministic, caller-facing errors; retrying without changing the
    /// input cannot succeed.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, BookingError::Storage(_))
    }
}
