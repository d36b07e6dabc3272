/// Store-level failures for the user and catalog query surfaces. The
/// Booking Engine's collaborators use `rentora_order::LedgerError` instead;
/// see `order_repo`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Translates unique/foreign-key violations on `what` into the typed
    /// variants; everything else stays a database error.
    pub fn from_constraint(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db) = &err {
            match db.code().as_deref() {
                Some("23505") => return StoreError::Duplicate(what.to_string()),
                Some("23503") => return StoreError::InvalidReference(what.to_string()),
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}
