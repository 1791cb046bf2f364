//! # Text Matcher
//!
//! Identifies which catalog product a block of recognized camera text refers to.
//!
//! The recognized text is lowercased, newlines become spaces and the result is
//! trimmed. Products are then probed in catalog order; a product matches when the
//! normalized text contains its lowercased article number or name. The first
//! matching product is returned and the scan stops there, so a text naming
//! several products only ever yields the earliest one in catalog order.

use tracing::{debug, trace};

use crate::product::Product;

/// Normalize recognized text for containment matching
pub fn normalize_text(raw_text: &str) -> String {
    raw_text.to_lowercase().replace('\n', " ").trim().to_string()
}

/// Normalize a product key (article number or name)
fn normalize_key(key: &str) -> String {
    key.to_lowercase().trim().to_string()
}

/// Whether the normalized text contains the product's article number or name
///
/// Empty keys never match; an empty article number would otherwise be contained
/// in every text.
fn product_matches(normalized_text: &str, product: &Product) -> bool {
    [&product.id, &product.name]
        .into_iter()
        .map(|key| normalize_key(key))
        .any(|key| !key.is_empty() && normalized_text.contains(&key))
}

/// Find the first product, in catalog order, mentioned in the recognized text
///
/// # Examples
///
/// ```rust
/// use zusatz_scanner::catalog::ProductCatalog;
/// use zusatz_scanner::text_matcher::find_first_match;
///
/// let catalog = ProductCatalog::from_text("100;Wiener Schnitzel\n200;Currywurst");
/// let hit = find_first_match("Heute gibt es\nCurrywurst mit Pommes", catalog.all()).unwrap();
/// assert_eq!(hit.id, "200");
/// assert!(find_first_match("Salatbuffet", catalog.all()).is_none());
/// ```
pub fn find_first_match<'a>(raw_text: &str, catalog: &'a [Product]) -> Option<&'a Product> {
    let normalized = normalize_text(raw_text);
    if normalized.is_empty() {
        return None;
    }

    let found = catalog.iter().find(|product| {
        trace!(id = %product.id, "Probing product against recognized text");
        product_matches(&normalized, product)
    });

    match found {
        Some(product) => debug!(id = %product.id, name = %product.name, "Recognized text matched product"),
        None => debug!(text_len = normalized.len(), "Recognized text matched no product"),
    }
    found
}
