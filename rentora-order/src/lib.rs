pub mod booking;
pub mod error;
pub mod ledger;
pub mod models;

pub use booking::{BookingEngine, RentalRequest, SaleRequest, PER_DAY_RATE};
pub use error::BookingError;
pub use ledger::{LedgerError, OrderLedger, ProductCatalog};
pub use models::{Order, OrderType, RentalStatus};
