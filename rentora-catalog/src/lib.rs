pub mod brand;
pub mod category;
pub mod product;
pub mod validation;

pub use brand::Brand;
pub use category::Category;
pub use product::{Product, ProductPatch};

/// Catalog-related errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Category not found: {0}")]
    CategoryNotFound(uuid::Uuid),

    #[error("Brand not found: {0}")]
    BrandNotFound(uuid::Uuid),

    #[error("Product not found: {0}")]
    ProductNotFound(uuid::Uuid),

    #[error("{0} already exists")]
    DuplicateName(String),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}
