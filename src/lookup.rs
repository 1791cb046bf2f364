//! # External Barcode Lookup
//!
//! Resolves barcodes that are not part of the supplier catalog against the
//! Open Food Facts product database. Results arrive as ready-made [`Product`]
//! records: their category is fixed, not classified, and their supplier carries
//! the `Extern` marker.
//!
//! Transport failures are retried with exponential backoff plus jitter and are
//! tracked by a [`CircuitBreaker`] so a dead endpoint stops being called.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info, warn, Instrument};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::LookupConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;
use crate::product::{Category, Product};

/// Supplier recorded on products resolved through Open Food Facts
pub const OPEN_FOOD_FACTS_SUPPLIER: &str = "Extern (Open Food Facts)";

/// Name used when the service knows the barcode but not the product name
pub const UNKNOWN_PRODUCT_NAME: &str = "Unbekanntes Produkt";

/// Source of externally resolved products
pub trait ProductLookup {
    /// Resolve a barcode; `Ok(None)` means the service does not know it
    fn lookup(&self, barcode: &str) -> impl Future<Output = AppResult<Option<Product>>> + Send;
}

/// Open Food Facts response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct OffResponse {
    pub product: Option<OffProduct>,
    pub status: i64,
}

/// The subset of an Open Food Facts product that is mapped
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OffProduct {
    pub product_name: Option<String>,
    pub allergens: Option<String>,
    pub image_front_url: Option<String>,
    pub additives_tags: Option<Vec<String>>,
}

/// Map an Open Food Facts response onto a product
///
/// Returns `None` unless the response reports status 1 and carries a product.
pub fn product_from_response(barcode: &str, response: OffResponse) -> Option<Product> {
    if response.status != 1 {
        return None;
    }
    let off_product = response.product?;

    Some(Product {
        id: barcode.to_string(),
        name: off_product
            .product_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_PRODUCT_NAME.to_string()),
        category: Category::Meat,
        allergen_codes: extract_allergens(&off_product),
        additive_codes: extract_additives(&off_product),
        supplier: OPEN_FOOD_FACTS_SUPPLIER.to_string(),
        raw_instruction: String::new(),
    })
}

/// `"en:gluten,en:milk"` becomes `["Gluten", "Milk"]`
fn extract_allergens(product: &OffProduct) -> Vec<String> {
    let Some(allergens) = product.allergens.as_deref() else {
        return Vec::new();
    };

    allergens
        .split(',')
        .map(|tag| capitalize_words(tag.replace("en:", "").trim()))
        .filter(|tag| !tag.is_empty() && tag != "-")
        .collect()
}

/// `"en:e300"` becomes `300`; tags with a suffix such as `"en:e150a"` are dropped
fn extract_additives(product: &OffProduct) -> Vec<i64> {
    product
        .additives_tags
        .iter()
        .flatten()
        .filter_map(|tag| tag.replace("en:e", "").parse::<i64>().ok())
        .collect()
}

fn capitalize_words(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Reject barcodes that cannot be a product code before building a URL from them
pub fn validate_barcode(barcode: &str) -> AppResult<&str> {
    let barcode = barcode.trim();
    if barcode.is_empty() {
        return Err(AppError::Validation("Barcode cannot be empty".to_string()));
    }
    if !barcode.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::Validation(format!(
            "Barcode '{}' contains invalid characters",
            barcode
        )));
    }
    Ok(barcode)
}

/// Calculate retry delay with exponential backoff
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay)
/// final_delay = delay + random(0, delay/4)
/// ```
pub fn calculate_retry_delay(attempt: u32, config: &LookupConfig) -> u64 {
    let exponent = attempt.saturating_sub(1).min(32);
    let delay = config
        .base_retry_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(config.max_retry_delay_ms);

    let jitter_range = delay / 4;
    let jitter = if jitter_range > 0 {
        rand::random::<u64>() % jitter_range
    } else {
        0
    };
    delay + jitter
}

/// HTTP client for the Open Food Facts product API
#[derive(Debug)]
pub struct OpenFoodFactsClient {
    client: reqwest::Client,
    config: LookupConfig,
    circuit_breaker: CircuitBreaker,
}

impl OpenFoodFactsClient {
    /// Create a client with the configured timeout
    pub fn new(config: LookupConfig) -> AppResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(concat!("zusatz-scanner/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            circuit_breaker: CircuitBreaker::from_config(&config),
            config,
        })
    }

    /// URL of the product document for a barcode
    pub fn product_url(&self, barcode: &str) -> String {
        format!("{}/{}.json", self.config.base_url.trim_end_matches('/'), barcode)
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    async fn fetch_once(&self, url: &str) -> AppResult<Option<OffResponse>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::Network(format!(
                "Lookup service answered with HTTP {}",
                status
            )));
        }

        let body = response.text().await?;
        let decoded = serde_json::from_str::<OffResponse>(&body).map_err(|e| {
            AppError::Validation(format!("Unexpected lookup response format: {}", e))
        })?;
        Ok(Some(decoded))
    }

    async fn fetch_with_retry(&self, barcode: &str) -> AppResult<Option<OffResponse>> {
        let url = self.product_url(barcode);
        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.fetch_once(&url).await {
                Ok(response) => {
                    self.circuit_breaker.record_success();
                    observability::update_circuit_breaker_state(false);
                    return Ok(response);
                }
                // Only transport failures are worth retrying
                Err(err @ AppError::Network(_)) if attempt < max_attempts => {
                    let delay_ms = calculate_retry_delay(attempt, &self.config);
                    warn!("Lookup attempt {attempt} failed: {err}. Retrying in {delay_ms}ms");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(err) => {
                    if matches!(err, AppError::Network(_)) {
                        self.circuit_breaker.record_failure();
                        observability::update_circuit_breaker_state(self.circuit_breaker.is_open());
                    }
                    error_logging::log_network_error(&err, "barcode_lookup", Some(url.as_str()), Some(attempt));
                    return Err(err);
                }
            }
        }
    }
}

impl ProductLookup for OpenFoodFactsClient {
    async fn lookup(&self, barcode: &str) -> AppResult<Option<Product>> {
        let barcode = validate_barcode(barcode)?;
        let span = observability::lookup_span("open_food_facts", barcode);
        self.lookup_validated(barcode).instrument(span).await
    }
}

impl OpenFoodFactsClient {
    async fn lookup_validated(&self, barcode: &str) -> AppResult<Option<Product>> {
        if !self.config.enabled {
            debug!("External lookup disabled, skipping barcode");
            return Ok(None);
        }

        if self.circuit_breaker.is_open() {
            warn!("Circuit breaker is open, rejecting lookup for barcode {barcode}");
            observability::update_circuit_breaker_state(true);
            return Err(AppError::Network(
                "Lookup service is temporarily unavailable due to repeated failures".to_string(),
            ));
        }

        let start = Instant::now();
        match self.fetch_with_retry(barcode).await {
            Ok(Some(response)) => {
                let product = product_from_response(barcode, response);
                let outcome = if product.is_some() { "found" } else { "not_found" };
                observability::record_lookup_metrics(outcome, start.elapsed());
                info!(found = product.is_some(), "External lookup completed");
                Ok(product)
            }
            Ok(None) => {
                observability::record_lookup_metrics("not_found", start.elapsed());
                info!("External lookup does not know barcode");
                Ok(None)
            }
            Err(err) => {
                observability::record_lookup_metrics("error", start.elapsed());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> OffResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_maps_found_product() {
        let response = response(
            r#"{
                "status": 1,
                "product": {
                    "product_name": "Nuss-Nougat-Creme",
                    "allergens": "en:milk, en:nuts,en:soybeans",
                    "image_front_url": "https://images.example/front.jpg",
                    "additives_tags": ["en:e322", "en:e150a", "en:e476"]
                }
            }"#,
        );
        let product = product_from_response("3017620422003", response).unwrap();

        assert_eq!(product.id, "3017620422003");
        assert_eq!(product.name, "Nuss-Nougat-Creme");
        assert_eq!(product.category, Category::Meat);
        assert_eq!(product.allergen_codes, vec!["Milk", "Nuts", "Soybeans"]);
        assert_eq!(product.additive_codes, vec![322, 476]);
        assert_eq!(product.supplier, OPEN_FOOD_FACTS_SUPPLIER);
        assert!(product.is_external());
        assert!(product.cooking_instruction().is_none());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let product =
            product_from_response("4000", response(r#"{"status": 1, "product": {}}"#)).unwrap();
        assert_eq!(product.name, UNKNOWN_PRODUCT_NAME);
        assert!(product.allergen_codes.is_empty());
        assert!(product.additive_codes.is_empty());
    }

    #[test]
    fn test_status_zero_is_not_found() {
        let json = r#"{"status": 0, "product": {"product_name": "x"}}"#;
        assert!(product_from_response("4000", response(json)).is_none());
        assert!(product_from_response("4000", response(r#"{"status": 1}"#)).is_none());
    }

    #[test]
    fn test_validate_barcode() {
        assert_eq!(validate_barcode(" 4008400 ").unwrap(), "4008400");
        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("12/../34").is_err());
    }

    #[test]
    fn test_retry_delay_growth_and_cap() {
        let config = LookupConfig {
            base_retry_delay_ms: 1000,
            max_retry_delay_ms: 3000,
            ..Default::default()
        };
        let first = calculate_retry_delay(1, &config);
        let second = calculate_retry_delay(2, &config);
        let capped = calculate_retry_delay(10, &config);

        assert!((1000..1250).contains(&first));
        assert!((2000..2500).contains(&second));
        assert!((3000..3750).contains(&capped));
    }

    #[test]
    fn test_retry_delay_without_jitter_room() {
        let config = LookupConfig {
            base_retry_delay_ms: 2,
            max_retry_delay_ms: 2,
            ..Default::default()
        };
        assert_eq!(calculate_retry_delay(1, &config), 2);
    }

    #[test]
    fn test_product_url() {
        let config = LookupConfig {
            base_url: "http://localhost:9/api/".to_string(),
            ..Default::default()
        };
        let client = OpenFoodFactsClient::new(config).unwrap();
        assert_eq!(client.product_url("123"), "http://localhost:9/api/123.json");
    }

    #[tokio::test]
    async fn test_disabled_lookup_returns_none() {
        let config = LookupConfig {
            enabled: false,
            ..Default::default()
        };
        let client = OpenFoodFactsClient::new(config).unwrap();
        assert_eq!(client.lookup("3017620422003").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_service_opens_breaker() {
        let config = LookupConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            http_timeout_secs: 1,
            max_retries: 0,
            circuit_breaker_threshold: 1,
            ..Default::default()
        };
        let client = OpenFoodFactsClient::new(config).unwrap();

        let err = client.lookup("4000").await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
        assert!(client.circuit_breaker().is_open());

        // Further calls are rejected without touching the network
        let err = client.lookup("4000").await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }
}
