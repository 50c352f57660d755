//! Input checks shared by the store and the HTTP layer.

use crate::constants::{MAX_USERNAME_LEN, MIN_DESCRIPTION_LEN, MIN_PASSWORD_LEN, MIN_USERNAME_LEN};
use crate::error::ValidationError;
use crate::types::GeoPoint;

/// Check registration credentials, collecting every failed rule.
pub fn validate_credentials(
    username: &str,
    password: &str,
    phone_number: &str,
) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    let name = username.trim();
    if name.is_empty() {
        errors.push("Username is required".to_string());
    } else if !name.chars().all(|c| c.is_ascii_alphabetic()) {
        errors.push("Username must contain only alphabetic characters".to_string());
    }
    let len = name.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        errors.push(format!(
            "Username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        ));
    }

    if password.trim().is_empty() {
        errors.push("Password is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }

    if phone_number.trim().is_empty() {
        errors.push("Phone number is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Credentials(errors))
    }
}

pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.chars().count() < MIN_DESCRIPTION_LEN {
        return Err(ValidationError::DescriptionTooShort {
            min: MIN_DESCRIPTION_LEN,
        });
    }
    Ok(())
}

/// Reject an absent or whitespace-only required text field.
pub fn require_text<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

/// Parse a location sent as a JSON array string, e.g. `"[85.3,27.7]"`.
pub fn parse_location(raw: &str) -> Result<GeoPoint, ValidationError> {
    let coords: Vec<f64> = serde_json::from_str(raw.trim()).map_err(|_| {
        ValidationError::InvalidLocation("expected a JSON array [longitude, latitude]".into())
    })?;
    GeoPoint::from_coordinates(&coords)
}
