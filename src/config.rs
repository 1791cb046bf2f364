//! # Unified Application Configuration
//!
//! Collects the catalog, lookup and observability settings into one structure
//! loaded from environment variables, with per-section validation.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::product::DEFAULT_SUPPLIER;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Catalog source configuration
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Path of the semicolon-delimited supplier export
    pub catalog_path: PathBuf,
    /// Optional JSON structured import appended after the catalog
    pub import_path: Option<PathBuf>,
    /// Supplier recorded for lines without a supplier column
    pub default_supplier: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("data/Produkte.csv"),
            import_path: None,
            default_supplier: DEFAULT_SUPPLIER.to_string(),
        }
    }
}

impl CatalogConfig {
    /// Validate catalog configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.catalog_path.as_os_str().is_empty() {
            return Err(AppError::Config("Catalog path cannot be empty".to_string()));
        }
        if self.default_supplier.trim().is_empty() {
            return Err(AppError::Config(
                "Default supplier cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// External barcode lookup configuration
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Whether barcode lookups are performed at all
    pub enabled: bool,
    /// Product endpoint; the barcode and `.json` are appended
    pub base_url: String,
    /// HTTP client timeout in seconds
    pub http_timeout_secs: u64,
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://world.openfoodfacts.org/api/v0/product".to_string(),
            http_timeout_secs: 30,
            max_retries: 2,
            base_retry_delay_ms: 500,
            max_retry_delay_ms: 5000,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60,
        }
    }
}

impl LookupConfig {
    /// Validate lookup configuration
    pub fn validate(&self) -> AppResult<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Lookup base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        if self.http_timeout_secs == 0 {
            return Err(AppError::Config("HTTP timeout cannot be 0".to_string()));
        }

        if self.http_timeout_secs > 300 {
            return Err(AppError::Config(
                "HTTP timeout cannot be greater than 300 seconds".to_string(),
            ));
        }

        if self.base_retry_delay_ms == 0 {
            return Err(AppError::Config(
                "base_retry_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.max_retry_delay_ms < self.base_retry_delay_ms {
            return Err(AppError::Config(format!(
                "max_retry_delay_ms ({}) must be >= base_retry_delay_ms ({})",
                self.max_retry_delay_ms, self.base_retry_delay_ms
            )));
        }

        if self.circuit_breaker_threshold == 0 {
            return Err(AppError::Config(
                "circuit_breaker_threshold must be greater than 0".to_string(),
            ));
        }

        if self.circuit_breaker_reset_secs == 0 {
            return Err(AppError::Config(
                "circuit_breaker_reset_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub lookup: LookupConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(path) = env::var("CATALOG_PATH") {
            config.catalog.catalog_path = PathBuf::from(path);
        }
        config.catalog.import_path = env::var("IMPORT_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        if let Ok(supplier) = env::var("DEFAULT_SUPPLIER") {
            config.catalog.default_supplier = supplier;
        }

        config.lookup.enabled = env::var("LOOKUP_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .to_lowercase()
            == "true";
        if let Ok(url) = env::var("LOOKUP_BASE_URL") {
            config.lookup.base_url = url.trim_end_matches('/').to_string();
        }
        config.lookup.http_timeout_secs = env_number("HTTP_CLIENT_TIMEOUT_SECS", 30)?;
        config.lookup.max_retries = env_number("LOOKUP_MAX_RETRIES", 2)?;
        config.lookup.base_retry_delay_ms = env_number("LOOKUP_BASE_RETRY_DELAY_MS", 500)?;
        config.lookup.max_retry_delay_ms = env_number("LOOKUP_MAX_RETRY_DELAY_MS", 5000)?;
        config.lookup.circuit_breaker_threshold =
            env_number("LOOKUP_CIRCUIT_BREAKER_THRESHOLD", 5)?;
        config.lookup.circuit_breaker_reset_secs =
            env_number("LOOKUP_CIRCUIT_BREAKER_RESET_SECS", 60)?;

        config.observability = ObservabilityConfig::from_env();

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.catalog.validate()?;
        self.lookup.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: catalog_path={}, import_path={}, lookup_enabled={}, lookup_base_url={}, environment={}",
            self.catalog.catalog_path.display(),
            self.catalog
                .import_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.lookup.enabled,
            self.lookup.base_url,
            self.observability.environment
        )
    }
}

/// Read a numeric environment variable, using `default` when it is unset
fn env_number<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a valid number", key))),
        Err(_) => Ok(default),
    }
}
