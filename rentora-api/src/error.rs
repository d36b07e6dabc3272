use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use rentora_catalog::CatalogError;
use rentora_order::BookingError;
use rentora_store::StoreError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::ProductNotFound(_) | BookingError::OrderNotFound(_) => {
                AppError::NotFoundError(err.to_string())
            }
            BookingError::DateRangeConflict => AppError::ConflictError(err.to_string()),
            BookingError::NotAvailableForSale
            | BookingError::NotAvailableForRent
            | BookingError::InvalidDateRange
            | BookingError::InvalidQuantity => AppError::ValidationError(err.to_string()),
            BookingError::Storage(inner) => AppError::InternalServerError(inner.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::CategoryNotFound(_)
            | CatalogError::BrandNotFound(_)
            | CatalogError::ProductNotFound(_) => AppError::NotFoundError(err.to_string()),
            CatalogError::DuplicateName(_) => AppError::ConflictError(err.to_string()),
            CatalogError::InvalidField { .. } => AppError::ValidationError(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) | StoreError::Conflict(_) => {
                AppError::ConflictError(err.to_string())
            }
            StoreError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            StoreError::InvalidReference(_) => AppError::ValidationError(err.to_string()),
            StoreError::Database(inner) => AppError::InternalServerError(inner.to_string()),
            StoreError::Corrupt(inner) => AppError::InternalServerError(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn booking_errors_map_to_expected_statuses() {
        let cases = [
            (BookingError::ProductNotFound(Uuid::new_v4()), StatusCode::NOT_FOUND),
            (BookingError::OrderNotFound(Uuid::new_v4()), StatusCode::NOT_FOUND),
            (BookingError::DateRangeConflict, StatusCode::CONFLICT),
            (BookingError::NotAvailableForSale, StatusCode::BAD_REQUEST),
            (BookingError::NotAvailableForRent, StatusCode::BAD_REQUEST),
            (BookingError::InvalidDateRange, StatusCode::BAD_REQUEST),
            (BookingError::InvalidQuantity, StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn store_duplicate_maps_to_conflict() {
        let response = AppError::from(StoreError::Duplicate("email".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let response =
            AppError::InternalServerError("connection refused at 10.0.0.3".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
