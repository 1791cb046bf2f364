//! # Scan Session
//!
//! Collects the products recognized during one scanning session. Text captures
//! and barcode lookups may complete concurrently, so the collection lives behind
//! a mutex and every append goes through [`ScanSession::merge`], which keeps the
//! first product seen for an article number and skips later ones. Every added
//! product is logged as a [`ScanEvent`] with the capture that produced it, so
//! the event log never outgrows the recognized products.
//!
//! The session also answers what the product list should show:
//! 1. a non-empty search text searches the whole catalog,
//! 2. otherwise recognized products are shown when there are any,
//! 3. otherwise the whole catalog is shown,
//!
//! and the optional category filter is applied to whichever list was chosen.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, Instrument};

use crate::catalog::ProductCatalog;
use crate::errors::AppResult;
use crate::lookup::ProductLookup;
use crate::observability;
use crate::product::{Category, Product};
use crate::text_matcher::find_first_match;

/// Where a recognized product came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanSource {
    /// Camera text matched against the catalog
    Text,
    /// Barcode resolved by the external lookup
    Barcode,
}

impl ScanSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanSource::Text => "text",
            ScanSource::Barcode => "barcode",
        }
    }
}

/// Capture that added a product to the session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanEvent {
    /// Raw recognized text or barcode
    pub content: String,
    pub source: ScanSource,
    /// Article number of the added product
    pub product_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of adding a product to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    /// A product with the same article number was already recognized
    AlreadyPresent,
}

/// List options chosen by the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewFilter {
    pub search_text: String,
    pub category: Option<Category>,
}

#[derive(Debug, Default)]
struct SessionState {
    detected: Vec<Product>,
    events: Vec<ScanEvent>,
}

/// Thread-safe collection of recognized products
#[derive(Debug, Default)]
pub struct ScanSession {
    state: Mutex<SessionState>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match recognized camera text against the catalog and keep the first hit
    ///
    /// Returns the matched product, whether or not it was already recognized.
    pub fn process_text(&self, raw_text: &str, catalog: &ProductCatalog) -> Option<Product> {
        let span = observability::scan_span("process_text");
        let _enter = span.enter();

        let matched = find_first_match(raw_text, catalog.all()).cloned();
        if let Some(product) = &matched {
            self.merge_capture(raw_text, product.clone(), ScanSource::Text);
        }
        matched
    }

    /// Resolve a barcode through the external lookup and keep the result
    ///
    /// `Ok(None)` means the lookup did not know the barcode.
    pub async fn search_external<L>(
        &self,
        lookup: &L,
        barcode: &str,
    ) -> AppResult<Option<MergeOutcome>>
    where
        L: ProductLookup,
    {
        let span = observability::scan_span("search_external");
        let found = lookup.lookup(barcode).instrument(span).await?;

        Ok(found.map(|product| self.merge_capture(barcode.trim(), product, ScanSource::Barcode)))
    }

    /// Append a product unless one with the same article number is present
    ///
    /// The recorded event uses the article number as its capture content.
    pub fn merge(&self, product: Product, source: ScanSource) -> MergeOutcome {
        let content = product.id.clone();
        self.merge_capture(&content, product, source)
    }

    fn merge_capture(&self, content: &str, product: Product, source: ScanSource) -> MergeOutcome {
        let mut state = self.state.lock();

        if state.detected.iter().any(|p| p.id == product.id) {
            debug!(id = %product.id, "Product already recognized, skipping");
            return MergeOutcome::AlreadyPresent;
        }

        info!(
            id = %product.id,
            name = %product.name,
            source = source.as_str(),
            total = state.detected.len() + 1,
            "Recognized product added"
        );
        observability::record_scan_match(source.as_str());
        state.events.push(ScanEvent {
            content: content.to_string(),
            source,
            product_id: product.id.clone(),
            timestamp: Utc::now(),
        });
        state.detected.push(product);
        MergeOutcome::Added
    }

    /// Recognized products in the order they were added
    pub fn detected(&self) -> Vec<Product> {
        self.state.lock().detected.clone()
    }

    /// Captures that added a product, in the order they were added
    pub fn events(&self) -> Vec<ScanEvent> {
        self.state.lock().events.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().detected.is_empty()
    }

    /// Forget all recognized products and captures
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.detected.clear();
        state.events.clear();
        info!("Scan session reset");
    }

    /// Products the list should show for the given filter
    pub fn visible_products(&self, catalog: &ProductCatalog, filter: &ViewFilter) -> Vec<Product> {
        let base: Vec<Product> = if !filter.search_text.is_empty() {
            catalog
                .search(&filter.search_text)
                .into_iter()
                .cloned()
                .collect()
        } else {
            let detected = self.detected();
            if detected.is_empty() {
                catalog.all().to_vec()
            } else {
                detected
            }
        };

        match filter.category {
            Some(category) => base.into_iter().filter(|p| p.category == category).collect(),
            None => base,
        }
    }
}
