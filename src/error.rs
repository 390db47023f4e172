//! Error types and handling for the school registry search

use crate::store::StoreError;
use serde::Serialize;
use std::fmt;

/// Message shown when a search is submitted without a term
pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a search term";

/// Application error types
#[derive(Debug, Serialize)]
pub enum AppError {
    /// Blank or whitespace-only search
    EmptyQuery,
    InvalidInput(String),
    /// Every record store call made for a request failed
    StoreUnavailable(String),
    /// Attaching secondary data to one record failed
    Enrichment(String),
    NotFound(String),
    Timeout(String),
    Config(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::EmptyQuery => write!(f, "Invalid input: {}", EMPTY_QUERY_MESSAGE),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::StoreUnavailable(msg) => write!(f, "Record store unavailable: {}", msg),
            AppError::Enrichment(msg) => write!(f, "Enrichment failed: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Get the error code for MCP responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::EmptyQuery => "empty_query",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Enrichment(_) => "enrichment_failed",
            AppError::NotFound(_) => "not_found",
            AppError::Timeout(_) => "timeout",
            AppError::Config(_) => "config_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Http(e) if e.is_timeout() => AppError::Timeout(e.to_string()),
            other => AppError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::StoreUnavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        AppError::Config(format!("Invalid search vocabulary: {}", err))
    }
}

/// Trim a raw query and reject blank input
pub fn validate_query(query: &str) -> Result<&str, AppError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(AppError::EmptyQuery);
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("  tecnica 4 ").unwrap(), "tecnica 4");
        assert!(matches!(validate_query(""), Err(AppError::EmptyQuery)));
        assert!(matches!(validate_query(" \t\n "), Err(AppError::EmptyQuery)));
        assert_eq!(validate_query("12345").unwrap(), "12345");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::EmptyQuery.error_code(), "empty_query");
        assert_eq!(
            AppError::StoreUnavailable("x".into()).error_code(),
            "store_unavailable"
        );
        assert_eq!(AppError::NotFound("x".into()).error_code(), "not_found");
    }

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            AppError::EmptyQuery.message(),
            "Invalid input: Please enter a search term"
        );
        assert_eq!(
            AppError::NotFound("CUE 10234567".into()).message(),
            "Not found: CUE 10234567"
        );
    }

    #[test]
    fn test_from_store_error() {
        let err: AppError = StoreError::Status {
            status: 503,
            body: "down".into(),
        }
        .into();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }
}
