use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

pub type Result<T> = std::result::Result<T, TaxError>;

pub const CALCULATION_ERROR: &str = "CALCULATION_ERROR";
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const INSUFFICIENT_DATA: &str = "INSUFFICIENT_DATA";
pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
pub const UNEXPECTED_ERROR: &str = "UNEXPECTED_ERROR";
pub const INCOMPLETE_RESULT: &str = "INCOMPLETE_RESULT";

#[derive(Debug, thiserror::Error)]
pub enum TaxError {
    /// Base calculation failure. `code` defaults to `CALCULATION_ERROR`.
    #[error("{message}")]
    Calculation {
        code: &'static str,
        message: String,
        details: BTreeMap<String, Value>,
    },
    #[error("{message}")]
    Validation {
        field: String,
        value: String,
        message: String,
    },
    #[error("{message}")]
    InsufficientData { missing: Vec<String>, message: String },
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Settings error: {0}")]
    Settings(String),
}

impl TaxError {
    pub fn calculation(message: impl Into<String>) -> Self {
        Self::Calculation {
            code: CALCULATION_ERROR,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_code(code: &'static str, message: impl Into<String>) -> Self {
        Self::Calculation {
            code,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn validation(
        field: impl Into<String>,
        value: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }

    pub fn insufficient(message: impl Into<String>, missing: &[&str]) -> Self {
        Self::InsufficientData {
            missing: missing.iter().map(|m| m.to_string()).collect(),
            message: message.into(),
        }
    }

    /// Wraps a failure that escaped a calculation into `UNEXPECTED_ERROR`.
    /// The typed calculation errors pass through untouched.
    pub fn unexpected(self, function: &str) -> Self {
        match self {
            Self::Calculation { .. } | Self::Validation { .. } | Self::InsufficientData { .. } => self,
            other => {
                let mut details = BTreeMap::new();
                details.insert("function".to_string(), Value::from(function));
                Self::Calculation {
                    code: UNEXPECTED_ERROR,
                    message: format!("Unexpected error during tax calculation: {other}"),
                    details,
                }
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Calculation { code, .. } => code,
            Self::Validation { .. } => VALIDATION_ERROR,
            Self::InsufficientData { .. } => INSUFFICIENT_DATA,
            Self::Db(_) => DATABASE_ERROR,
            Self::Io(_) | Self::Settings(_) => UNEXPECTED_ERROR,
        }
    }

    pub fn details(&self) -> BTreeMap<String, Value> {
        match self {
            Self::Calculation { details, .. } => details.clone(),
            Self::Validation { field, value, .. } => BTreeMap::from([
                ("field".to_string(), Value::from(field.as_str())),
                ("value".to_string(), Value::from(value.as_str())),
            ]),
            Self::InsufficientData { missing, .. } => {
                BTreeMap::from([("missing_data".to_string(), Value::from(missing.clone()))])
            }
            _ => BTreeMap::new(),
        }
    }

    /// Text suitable for showing to a trader rather than a developer.
    pub fn user_message(&self) -> String {
        if let Self::Validation { field, .. } = self {
            if !field.is_empty() {
                return format!("Please check the {} field and try again.", title_case(field));
            }
        }
        match self.code() {
            VALIDATION_ERROR => "Please check your input data and try again.",
            INSUFFICIENT_DATA => {
                "Some required information is missing. Please provide all necessary details."
            }
            CALCULATION_ERROR => "We encountered an error while calculating your tax. Please try again.",
            DATABASE_ERROR => "We are experiencing technical difficulties. Please try again later.",
            UNEXPECTED_ERROR => "An unexpected error occurred. Please try again or contact support.",
            _ => "An error occurred during tax calculation. Please try again.",
        }
        .to_string()
    }
}

fn title_case(field: &str) -> String {
    field
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Failure payload handed to presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error_code: String,
    pub error_message: String,
    pub user_message: String,
    pub details: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn from_error(error: &TaxError, taxpayer_id: Option<&str>) -> Self {
        tracing::error!(
            taxpayer = taxpayer_id.unwrap_or("-"),
            code = error.code(),
            "tax calculation error: {error}"
        );
        Self {
            success: false,
            error_code: error.code().to_string(),
            error_message: error.to_string(),
            user_message: error.user_message(),
            details: error.details(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(TaxError::calculation("x").code(), "CALCULATION_ERROR");
        assert_eq!(TaxError::validation("tax_year", 1999, "bad").code(), "VALIDATION_ERROR");
        assert_eq!(TaxError::insufficient("no ledger", &["ledger"]).code(), "INSUFFICIENT_DATA");
        assert_eq!(TaxError::Settings("x".into()).code(), "UNEXPECTED_ERROR");
    }

    #[test]
    fn test_validation_user_message_names_field() {
        let err = TaxError::validation("tax_year", 1999, "Invalid tax year");
        assert_eq!(err.user_message(), "Please check the Tax Year field and try again.");
    }

    #[test]
    fn test_user_message_by_code() {
        let err = TaxError::insufficient("no ledger", &["ledger"]);
        assert!(err.user_message().starts_with("Some required information is missing"));
        let err = TaxError::with_code("STEP1_FAILURE", "x");
        assert_eq!(err.user_message(), "An error occurred during tax calculation. Please try again.");
    }

    #[test]
    fn test_unexpected_wraps_ambient_errors_only() {
        let wrapped = TaxError::Settings("disk full".into()).unexpected("calculate_tax_liability");
        assert_eq!(wrapped.code(), "UNEXPECTED_ERROR");
        assert_eq!(
            wrapped.details().get("function").and_then(|v| v.as_str()),
            Some("calculate_tax_liability")
        );
        assert!(wrapped.to_string().contains("disk full"));

        let typed = TaxError::validation("taxpayer_id", "", "required").unexpected("x");
        assert_eq!(typed.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_details_carry_field_and_missing() {
        let err = TaxError::validation("tax_year", 2101, "out of range");
        let d = err.details();
        assert_eq!(d["field"], "tax_year");
        assert_eq!(d["value"], "2101");

        let err = TaxError::insufficient("x", &["ledger", "income_data"]);
        assert_eq!(err.details()["missing_data"], serde_json::json!(["ledger", "income_data"]));
    }

    #[test]
    fn test_error_response() {
        let err = TaxError::validation("taxpayer_id", "", "Taxpayer ID is required");
        let resp = ErrorResponse::from_error(&err, None);
        assert!(!resp.success);
        assert_eq!(resp.error_code, "VALIDATION_ERROR");
        assert_eq!(resp.error_message, "Taxpayer ID is required");
        assert_eq!(resp.user_message, "Please check the Taxpayer Id field and try again.");
    }
}
