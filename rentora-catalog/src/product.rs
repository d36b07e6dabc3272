use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// A catalog item owned by exactly one lender. `for_sale` and `for_rent`
/// are independent flags: both, either, or neither may be set. "Neither"
/// is accepted by validation; such a product simply can never be ordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Whole currency units.
    pub unit_price: i32,
    pub for_sale: bool,
    pub for_rent: bool,
    pub category_id: Uuid,
    pub brand_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for the edit endpoint. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<i32>,
    pub for_sale: Option<bool>,
    pub for_rent: Option<bool>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.unit_price.is_none()
            && self.for_sale.is_none()
            && self.for_rent.is_none()
            && self.category_id.is_none()
            && self.brand_id.is_none()
    }
}
