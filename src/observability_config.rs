//! # Observability Configuration
//!
//! Environment-specific settings for structured logging and metrics export.

use std::env;

/// Log output formats supported by the subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output
    Pretty,
    /// One JSON object per event
    Json,
}

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Log level for the crate's own targets
    pub log_level: String,
    /// Explicit format override; `None` picks pretty in development and JSON elsewhere
    pub log_format: Option<LogFormat>,
    /// Port of the Prometheus scrape endpoint; `None` disables the exporter
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: None,
            metrics_port: None,
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").ok().and_then(|v| parse_log_format(&v)),
            metrics_port: env::var("METRICS_PORT").ok().and_then(|v| v.parse().ok()),
        }
    }

    /// Check if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// The format the subscriber should use
    pub fn effective_log_format(&self) -> LogFormat {
        match self.log_format {
            Some(format) => format,
            None if self.is_development() => LogFormat::Pretty,
            None => LogFormat::Json,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::errors::AppResult<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(crate::errors::AppError::Config(format!(
                "Invalid log level: {}",
                self.log_level
            )));
        }

        if self.metrics_port == Some(0) {
            return Err(crate::errors::AppError::Config(
                "Invalid metrics port: 0".to_string(),
            ));
        }

        if self.environment.trim().is_empty() {
            return Err(crate::errors::AppError::Config(
                "Environment name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_log_format(value: &str) -> Option<LogFormat> {
    match value.trim().to_lowercase().as_str() {
        "pretty" => Some(LogFormat::Pretty),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}
