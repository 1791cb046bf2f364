//! # Application Error Types
//!
//! This module defines the error types shared by the catalog, scan and lookup
//! components. Malformed catalog *content* never becomes an error; only failures
//! to reach or decode a data source are surfaced here.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Validation errors (barcodes, search input, etc.)
    Validation(String),
    /// Catalog source could not be read
    Catalog(String),
    /// Structured import payload could not be read or decoded
    Import(String),
    /// Network/communication errors with the external lookup service
    Network(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::Catalog(msg) => write!(f, "[CATALOG] {}", msg),
            AppError::Import(msg) => write!(f, "[IMPORT] {}", msg),
            AppError::Network(msg) => write!(f, "[NETWORK] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Whether this error means a data source was unavailable or unreadable
    pub fn is_data_access(&self) -> bool {
        matches!(self, AppError::Catalog(_) | AppError::Import(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::error;

    /// Log a catalog source that could not be loaded
    pub fn log_catalog_error(error: &impl std::fmt::Display, operation: &str, path: Option<&str>) {
        error!(
            error = %error,
            operation = %operation,
            path = ?path,
            "Catalog source unavailable"
        );
    }

    /// Log a structured import payload that could not be decoded
    pub fn log_import_error(
        error: &impl std::fmt::Display,
        operation: &str,
        path: Option<&str>,
        payload_size: Option<usize>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            path = ?path,
            payload_size_bytes = ?payload_size,
            "Structured import failed"
        );
    }

    /// Log network/communication errors with connection context
    pub fn log_network_error(
        error: &impl std::fmt::Display,
        operation: &str,
        endpoint: Option<&str>,
        attempt_count: Option<u32>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            endpoint = ?endpoint,
            attempt_count = ?attempt_count,
            "Network operation failed"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}
