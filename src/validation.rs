// Validation utilities module
// Custom rules used by the request validators

use std::borrow::Cow;

use rust_decimal::Decimal;
use uuid::Uuid;
use validator::ValidationError;

fn with_message(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Ids must be present (non-nil)
pub fn validate_not_nil(id: &Uuid) -> Result<(), ValidationError> {
    if id.is_nil() {
        Err(with_message("id_required", "Id is required."))
    } else {
        Ok(())
    }
}

/// Validates that price is strictly positive
pub fn validate_positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        Err(with_message("price_must_be_positive", "Price must be greater than 0."))
    } else {
        Ok(())
    }
}

/// Rejects values that are empty once surrounding whitespace is removed
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(with_message("required", "Value is required."))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_not_nil() {
        assert!(validate_not_nil(&Uuid::nil()).is_err());
        assert!(validate_not_nil(&Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_positive_price() {
        assert!(validate_positive_price(&dec!(0)).is_err());
        assert!(validate_positive_price(&dec!(-1.50)).is_err());
        assert!(validate_positive_price(&dec!(0.01)).is_ok());
    }

    #[test]
    fn test_not_blank() {
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("x").is_ok());
        let err = validate_not_blank("").unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Value is required."));
    }
}
