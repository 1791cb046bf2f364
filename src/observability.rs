//! Observability module for structured logging, spans and metrics.
//!
//! This module provides:
//! - `tracing` subscriber setup with environment-dependent formatting
//! - Span constructors for catalog, scan and lookup operations
//! - Prometheus exporter setup and metric recording helpers on top of the
//!   `metrics` facade
//!
//! Without an installed exporter the counters are no-ops.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::prelude::*;

use crate::observability_config::{LogFormat, ObservabilityConfig};

/// Initialize structured logging with tracing and configuration
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("zusatz_scanner={}", config.log_level).parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?);

    match config.effective_log_format() {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?,
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Install the Prometheus exporter when a metrics port is configured
///
/// Serves the scrape endpoint on `0.0.0.0:<port>`; must run inside a Tokio runtime.
pub fn init_metrics_with_config(config: &ObservabilityConfig) -> Result<()> {
    let Some(port) = config.metrics_port else {
        tracing::debug!("Metrics export disabled");
        return Ok(());
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Create a span for catalog operations
pub fn catalog_span(operation: &str) -> tracing::Span {
    tracing::info_span!("catalog_operation", operation = operation, component = "catalog")
}

/// Create a span for text-matching scans
pub fn scan_span(operation: &str) -> tracing::Span {
    tracing::info_span!("scan_operation", operation = operation, component = "scanner")
}

/// Create a span for external barcode lookups
pub fn lookup_span(operation: &str, barcode: &str) -> tracing::Span {
    tracing::info_span!(
        "lookup_operation",
        operation = operation,
        barcode = barcode,
        component = "lookup"
    )
}

/// Record a product merged into the scan results
pub fn record_scan_match(source: &'static str) {
    metrics::counter!("scan_matches_total", "source" => source).increment(1);
}

/// Record the outcome of an external lookup
pub fn record_lookup_metrics(result: &'static str, duration: Duration) {
    metrics::counter!("lookup_requests_total", "result" => result).increment(1);
    metrics::histogram!("lookup_duration_seconds").record(duration.as_secs_f64());
}

/// Mirror the circuit breaker state as a gauge (1 = open)
pub fn update_circuit_breaker_state(is_open: bool) {
    metrics::gauge!("lookup_circuit_breaker_open").set(if is_open { 1.0 } else { 0.0 });
}
