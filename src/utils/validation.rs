use crate::utils::error::{EstimateError, Result};
use url::Url;

/// Maximum storage-in-transit days the rate engine will price.
pub const MAX_SIT_DAYS: u32 = 90;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EstimateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EstimateError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EstimateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EstimateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EstimateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// Record ids become one file name or one URL path segment, never more.
pub fn validate_record_id(field_name: &str, id: &str) -> Result<()> {
    let reason = if id.is_empty() {
        Some("Id cannot be empty")
    } else if id == "." || id == ".." {
        Some("Id cannot be a relative path component")
    } else if id.contains(['/', '\\']) {
        Some("Id cannot contain path separators")
    } else if id.chars().any(char::is_control) {
        Some("Id contains control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(EstimateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: id.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(EstimateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| EstimateError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EstimateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(EstimateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Postal codes are dispatched only once the user has typed all five digits.
pub fn validate_postal_code(field_name: &str, value: &str) -> Result<()> {
    if value.len() != 5 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EstimateError::ValidationRejected {
            field: field_name.to_string(),
            reason: format!("'{}' is not a 5-digit postal code", value),
        });
    }
    Ok(())
}

pub fn validate_sit_days(field_name: &str, sit_days: Option<u32>) -> Result<u32> {
    match sit_days {
        None => Err(EstimateError::ValidationRejected {
            field: field_name.to_string(),
            reason: "required when storage in transit is requested".to_string(),
        }),
        Some(days) if days > MAX_SIT_DAYS => Err(EstimateError::ValidationRejected {
            field: field_name.to_string(),
            reason: format!("{} exceeds the {} day limit", days, MAX_SIT_DAYS),
        }),
        Some(days) => Ok(days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("rate_engine.endpoint", "https://example.com").is_ok());
        assert!(validate_url("rate_engine.endpoint", "http://example.com").is_ok());
        assert!(validate_url("rate_engine.endpoint", "").is_err());
        assert!(validate_url("rate_engine.endpoint", "invalid-url").is_err());
        assert!(validate_url("rate_engine.endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_record_id() {
        assert!(validate_record_id("move_id", "move-1").is_ok());
        assert!(validate_record_id("move_id", "3f9c2a1e-7b2d-4c55-9e1a-0d7f2b6c8a90").is_ok());
        assert!(validate_record_id("move_id", "").is_err());
        assert!(validate_record_id("move_id", ".").is_err());
        assert!(validate_record_id("move_id", "..").is_err());
        assert!(validate_record_id("move_id", "../escaped").is_err());
        assert!(validate_record_id("move_id", "a/b").is_err());
        assert!(validate_record_id("move_id", "a\\b").is_err());
        assert!(validate_record_id("move_id", "a\0b").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("timeout_seconds", 5, 1).is_ok());
        assert!(validate_positive_number("timeout_seconds", 0, 1).is_err());
    }

    #[test]
    fn test_validate_postal_code() {
        assert!(validate_postal_code("origin_postal_code", "90210").is_ok());
        assert!(validate_postal_code("origin_postal_code", "9021").is_err());
        assert!(validate_postal_code("origin_postal_code", "902101").is_err());
        assert!(validate_postal_code("origin_postal_code", "9021a").is_err());
        assert!(validate_postal_code("origin_postal_code", "").is_err());
    }

    #[test]
    fn test_validate_sit_days_bounds() {
        assert_eq!(validate_sit_days("sit_days", Some(0)).unwrap(), 0);
        assert_eq!(validate_sit_days("sit_days", Some(90)).unwrap(), 90);
        assert!(validate_sit_days("sit_days", Some(91)).is_err());
        assert!(validate_sit_days("sit_days", None).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("debounce_ms", 300, 0, 5000).is_ok());
        assert!(validate_range("debounce_ms", 6000, 0, 5000).is_err());
    }
}
