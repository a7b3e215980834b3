use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstimateError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    /// Local rejection of a candidate; never reaches the rate engine.
    #[error("Estimate request rejected on '{field}': {reason}")]
    ValidationRejected { field: String, reason: String },

    #[error("PPM store returned {status}: {message}")]
    StoreError { status: u16, message: String },

    #[error("No PPM record found for move {move_id}")]
    RecordNotFound { move_id: String },

    #[error("Estimate did not resolve within {seconds}s")]
    EstimateTimeout { seconds: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Storage,
    Configuration,
    Validation,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EstimateError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EstimateError::ApiError(_) | EstimateError::EstimateTimeout { .. } => {
                ErrorCategory::Network
            }
            EstimateError::IoError(_)
            | EstimateError::StoreError { .. }
            | EstimateError::RecordNotFound { .. } => ErrorCategory::Storage,
            EstimateError::ConfigError { .. }
            | EstimateError::ConfigValidationError { .. }
            | EstimateError::InvalidConfigValueError { .. }
            | EstimateError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EstimateError::ValidationRejected { .. } => ErrorCategory::Validation,
            EstimateError::SerializationError(_) => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EstimateError::ValidationRejected { .. } => ErrorSeverity::Low,
            EstimateError::ApiError(_)
            | EstimateError::EstimateTimeout { .. }
            | EstimateError::StoreError { .. } => ErrorSeverity::Medium,
            EstimateError::RecordNotFound { .. } | EstimateError::SerializationError(_) => {
                ErrorSeverity::High
            }
            EstimateError::IoError(_)
            | EstimateError::ConfigError { .. }
            | EstimateError::ConfigValidationError { .. }
            | EstimateError::InvalidConfigValueError { .. }
            | EstimateError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EstimateError::ApiError(_) => "Could not reach the remote service".to_string(),
            EstimateError::EstimateTimeout { seconds } => {
                format!("The incentive estimate is not ready yet (waited {}s)", seconds)
            }
            EstimateError::StoreError { status, .. } => {
                format!("The PPM record could not be read or saved (status {})", status)
            }
            EstimateError::RecordNotFound { move_id } => {
                format!("Move {} has no PPM shipment", move_id)
            }
            EstimateError::ValidationRejected { field, reason } => {
                format!("{} is not valid: {}", field, reason)
            }
            EstimateError::IoError(e) => format!("File access failed: {}", e),
            EstimateError::SerializationError(_) => {
                "The PPM record is not in the expected format".to_string()
            }
            other => format!("Invalid configuration: {}", other),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the rate engine endpoint and try again",
            ErrorCategory::Storage => "Check the move id and the PPM store location",
            ErrorCategory::Configuration => "Review the command line flags or the TOML config file",
            ErrorCategory::Validation => "Correct the highlighted shipment field",
            ErrorCategory::Data => "Re-create the PPM record from the office application",
        }
    }
}

pub type Result<T> = std::result::Result<T, EstimateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejections_are_low_severity() {
        let err = EstimateError::ValidationRejected {
            field: "origin_postal_code".to_string(),
            reason: "must be exactly 5 digits".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert!(err.user_friendly_message().contains("origin_postal_code"));
    }

    #[test]
    fn config_errors_are_critical() {
        let err = EstimateError::MissingConfigError {
            field: "rate_engine.endpoint".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(
            err.recovery_suggestion(),
            "Review the command line flags or the TOML config file"
        );
    }

    #[test]
    fn store_errors_report_status() {
        let err = EstimateError::StoreError {
            status: 503,
            message: "down".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Storage);
        assert!(err.user_friendly_message().contains("503"));
    }
}
