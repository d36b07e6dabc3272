use crate::CatalogError;

const MAX_NAME_LEN: usize = 120;

/// Validates a category, brand, or product name before insert.
pub fn validate_name(field: &'static str, name: &str) -> Result<(), CatalogError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(CatalogError::InvalidField { field, reason: "must not be empty".into() });
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CatalogError::InvalidField {
            field,
            reason: format!("longer than {MAX_NAME_LEN} characters"),
        });
    }
    Ok(())
}

/// Prices are whole currency units and may not be negative. Zero is
/// allowed: free listings exist.
pub fn validate_price(price: i32) -> Result<(), CatalogError> {
    if price < 0 {
        return Err(CatalogError::InvalidField {
            field: "unit_price",
            reason: "must not be negative".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_rejected() {
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", "Denim Jacket").is_ok());
    }

    #[test]
    fn overlong_name_rejected() {
        assert!(validate_name("name", &"x".repeat(121)).is_err());
        assert!(validate_name("name", &"x".repeat(120)).is_ok());
    }

    #[test]
    fn negative_price_rejected() {
        assert!(validate_price(-1).is_err());
        assert!(validate_price(0).is_ok());
        assert!(validate_price(4200).is_ok());
    }
}
