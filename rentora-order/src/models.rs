use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};

/// Which flow created the order. This is the only discriminator: a rent
/// order carries the rental fields, a buy order leaves them empty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Buy,
    Rent,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Buy => "buy",
            OrderType::Rent => "rent",
        }
    }
}

impl std::str::FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(OrderType::Buy),
            "rent" => Ok(OrderType::Rent),
            other => Err(format!("unknown order type: {other}")),
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable record of a completed sale or rental booking. Orders are
/// never updated in place; the only mutation after creation is deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub order_type: OrderType,
    pub quantity: i32,
    /// Product price snapshot at order time, whole currency units.
    pub unit_price: i32,
    pub total_cost: i32,
    pub order_date: DateTime<Utc>,
    /// Rental fields; all None for buy orders.
    pub per_day: Option<i32>,
    pub rent_start: Option<NaiveDate>,
    pub rent_end: Option<NaiveDate>,
    pub total_days: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derived at read time from today's date; never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    Upcoming,
    Current,
    Completed,
}

impl Order {
    /// Where this rental sits relative to `today`. Buy orders have no
    /// derived status.
    pub fn rental_status(&self, today: NaiveDate) -> Option<RentalStatus> {
        let (start, end) = match (self.rent_start, self.rent_end) {
            (Some(s), Some(e)) if self.order_type == OrderType::Rent => (s, e),
            _ => return None,
        };

        if end < today {
            Some(RentalStatus::Completed)
        } else if start <= today {
            Some(RentalStatus::Current)
        } else {
            Some(RentalStatus::Upcoming)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rent_order(start: NaiveDate, end: NaiveDate) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            order_type: OrderType::Rent,
            quantity: 1,
            unit_price: 100,
            total_cost: 100,
            order_date: now,
            per_day: Some(50),
            rent_start: Some(start),
            rent_end: Some(end),
            total_days: Some(1),
            created_at: now,
            updated_at: now,
        }
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn status_is_derived_from_today() {
        let order = rent_order(d("2024-03-10"), d("2024-03-12"));
        assert_eq!(order.rental_status(d("2024-03-09")), Some(RentalStatus::Upcoming));
        assert_eq!(order.rental_status(d("2024-03-10")), Some(RentalStatus::Current));
        assert_eq!(order.rental_status(d("2024-03-12")), Some(RentalStatus::Current));
        assert_eq!(order.rental_status(d("2024-03-13")), Some(RentalStatus::Completed));
    }

    #[test]
    fn buy_orders_have_no_status() {
        let mut order = rent_order(d("2024-03-10"), d("2024-03-12"));
        order.order_type = OrderType::Buy;
        order.rent_start = None;
        order.rent_end = None;
        assert_eq!(order.rental_status(d("2024-03-11")), None);
    }
}
