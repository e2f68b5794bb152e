//! Field checks applied before anything is written.
//!
//! Text is trimmed first. Required text must be non-empty afterwards; optional
//! text that trims to nothing is treated as absent.

use crate::error::ValidationError;
use crate::models::Quantity;

pub const RATING_MIN: i32 = 1;
pub const RATING_MAX: i32 = 5;

pub const LONG_TEXT: usize = 255;
pub const SHORT_TEXT: usize = 100;
pub const UNIT_TEXT: usize = 50;

pub fn required(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Missing { field });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value.to_string())
}

/// Unbounded required text, for columns without a length limit.
pub fn required_unbounded(field: &'static str, value: &str) -> Result<String, ValidationError> {
    required(field, value, usize::MAX)
}

pub fn optional(
    field: &'static str,
    value: Option<&str>,
    max: Option<usize>,
) -> Result<Option<String>, ValidationError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if let Some(max) = max {
        if value.chars().count() > max {
            return Err(ValidationError::TooLong { field, max });
        }
    }
    Ok(Some(value.to_string()))
}

/// Returns the address trimmed and lower-cased.
pub fn email(value: &str) -> Result<String, ValidationError> {
    // Length is checked on the lower-cased form.
    let normalized = required("email", &value.to_lowercase(), LONG_TEXT)?;
    let invalid = || ValidationError::InvalidEmail(value.to_string());

    let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || normalized.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }
    Ok(normalized)
}

pub fn rating(value: i32) -> Result<i32, ValidationError> {
    if !(RATING_MIN..=RATING_MAX).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: "rating",
            reason: format!("{value} is not between {RATING_MIN} and {RATING_MAX}"),
        });
    }
    Ok(value)
}

pub fn non_negative(field: &'static str, value: Option<i32>) -> Result<Option<i32>, ValidationError> {
    match value {
        Some(v) if v < 0 => Err(ValidationError::OutOfRange {
            field,
            reason: format!("{v} is negative"),
        }),
        other => Ok(other),
    }
}

/// Re-checks the fixed-point format, which deserialized values may bypass.
fn quantity(quantity: &Quantity) -> Result<Quantity, ValidationError> {
    Quantity::new(quantity.value())
}

pub fn positive_quantity(field: &'static str, value: &Quantity) -> Result<Quantity, ValidationError> {
    let value = quantity(value)?;
    if value.is_zero() || value.is_negative() {
        return Err(ValidationError::OutOfRange {
            field,
            reason: format!("{value} must be greater than zero"),
        });
    }
    Ok(value)
}

pub fn non_negative_quantity(
    field: &'static str,
    value: &Quantity,
) -> Result<Quantity, ValidationError> {
    let value = quantity(value)?;
    if value.is_negative() {
        return Err(ValidationError::OutOfRange {
            field,
            reason: format!("{value} is negative"),
        });
    }
    Ok(value)
}
