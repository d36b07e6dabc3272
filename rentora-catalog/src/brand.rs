use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// A brand always belongs to one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Brand {
    pub fn new(name: String, category_id: Uuid) -> Self {
        let now = Utc::now();
        Self { id: Uuid::new_v4(), name, category_id, created_at: now, updated_at: now }
    }
}
