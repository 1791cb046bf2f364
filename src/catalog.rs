//! # Catalog Ingestion
//!
//! Turns the semicolon-delimited supplier export into [`Product`] records and
//! holds them in an ordered, in-memory [`ProductCatalog`].
//!
//! ## Column layout
//!
//! | Index | Content | Missing column |
//! |-------|---------|----------------|
//! | 0 | article number | line dropped |
//! | 1 | name | line dropped |
//! | 2 | unused | |
//! | 3 | allergen codes, comma separated | empty |
//! | 4 | additive codes, comma separated | empty |
//! | 5 | supplier | `"Seubert"` |
//! | 6 | preparation text | empty |
//!
//! Ingestion is permissive: short lines and non-numeric additive tokens are
//! skipped without error. Only an unreadable source (missing file, broken JSON
//! import) is reported as an [`AppError`].

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::classification::classify;
use crate::errors::{error_logging, AppError, AppResult};
use crate::product::{Category, Product, DEFAULT_SUPPLIER};

/// Column delimiter of the supplier export
pub const COLUMN_DELIMITER: char = ';';

/// Delimiter inside the allergen and additive columns
pub const CODE_DELIMITER: char = ',';

/// Tokens identifying a header row on the first line
const HEADER_TOKENS: [&str; 2] = ["ArtNr", "Name"];

/// Whether `c` ends a catalog line; exports may use LF, CR, CRLF or Unicode separators
fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// Parser for supplier catalog lines
#[derive(Debug, Clone)]
pub struct CatalogParser {
    default_supplier: String,
}

impl Default for CatalogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogParser {
    /// Create a parser that records `"Seubert"` for lines without a supplier column
    pub fn new() -> Self {
        Self {
            default_supplier: DEFAULT_SUPPLIER.to_string(),
        }
    }

    /// Create a parser with a custom fallback supplier
    pub fn with_default_supplier(supplier: &str) -> Self {
        Self {
            default_supplier: supplier.to_string(),
        }
    }

    /// Parse one catalog line into a product
    ///
    /// Returns `None` when the line has fewer than two columns.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zusatz_scanner::catalog::CatalogParser;
    /// use zusatz_scanner::product::Category;
    ///
    /// let parser = CatalogParser::new();
    /// let product = parser.parse_line("1801; Lachsfilet ;;D;;;200°C, 12 Min").unwrap();
    /// assert_eq!(product.name, "Lachsfilet");
    /// assert_eq!(product.category, Category::Fish);
    /// assert_eq!(product.allergen_codes, vec!["D"]);
    /// assert!(parser.parse_line("kein Trenner").is_none());
    /// ```
    pub fn parse_line(&self, line: &str) -> Option<Product> {
        let columns: Vec<&str> = line.split(COLUMN_DELIMITER).map(str::trim).collect();
        if columns.len() < 2 {
            return None;
        }

        let id = columns[0].to_string();
        let name = columns[1].to_string();
        let category = classify(&id, &name);

        let allergen_codes = columns
            .get(3)
            .map(|column| parse_allergen_codes(column))
            .unwrap_or_default();
        let additive_codes = columns
            .get(4)
            .map(|column| parse_additive_codes(column))
            .unwrap_or_default();
        let supplier = columns
            .get(5)
            .map(|column| column.to_string())
            .unwrap_or_else(|| self.default_supplier.clone());
        let raw_instruction = columns
            .get(6)
            .map(|column| column.to_string())
            .unwrap_or_default();

        Some(Product {
            id,
            name,
            category,
            allergen_codes,
            additive_codes,
            supplier,
            raw_instruction,
        })
    }

    /// Parse a complete catalog export
    ///
    /// Lines end at any line break (`\n`, `\r`, `\r\n` or a Unicode separator).
    /// Blank lines are skipped, as is a header on the very first line (one that
    /// mentions `ArtNr` or `Name`). Lines with fewer than two columns are dropped.
    pub fn parse_catalog(&self, text: &str) -> Vec<Product> {
        let mut products = Vec::new();
        let mut dropped = 0usize;

        for (index, line) in text.split(is_line_break).enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if index == 0 && HEADER_TOKENS.iter().any(|token| line.contains(token)) {
                debug!(header = %line, "Skipping catalog header");
                continue;
            }

            match self.parse_line(line) {
                Some(product) => products.push(product),
                None => {
                    dropped += 1;
                    debug!(line_number = index, line = %line, "Dropping catalog line with too few columns");
                }
            }
        }

        metrics::counter!("catalog_lines_dropped_total").increment(dropped as u64);
        info!(
            products = products.len(),
            dropped_lines = dropped,
            "Parsed catalog text"
        );
        products
    }
}

/// Parse one catalog line with the default parser
pub fn parse_line(line: &str) -> Option<Product> {
    CatalogParser::new().parse_line(line)
}

/// Parse a catalog export with the default parser
pub fn parse_catalog(text: &str) -> Vec<Product> {
    CatalogParser::new().parse_catalog(text)
}

/// Split an allergen column into uppercase tokens, dropping empties and `-`
pub fn parse_allergen_codes(column: &str) -> Vec<String> {
    column
        .split(CODE_DELIMITER)
        .map(|token| token.trim().to_uppercase())
        .filter(|token| !token.is_empty() && token != "-")
        .collect()
}

/// Split an additive column into integers, dropping tokens that are not numbers
pub fn parse_additive_codes(column: &str) -> Vec<i64> {
    column
        .split(CODE_DELIMITER)
        .filter_map(|token| token.trim().parse::<i64>().ok())
        .collect()
}

/// Ordered in-memory product collection
///
/// Preserves source order and keeps duplicate article numbers as they appear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already constructed products
    pub fn from_products(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Build a catalog by parsing a complete export
    pub fn from_text(text: &str) -> Self {
        Self::from_products(parse_catalog(text))
    }

    /// Build a catalog with a specific parser
    pub fn from_text_with(parser: &CatalogParser, text: &str) -> Self {
        Self::from_products(parser.parse_catalog(text))
    }

    /// All products in source order
    pub fn all(&self) -> &[Product] {
        &self.products
    }

    /// Products satisfying `predicate`, in source order
    pub fn filter<P>(&self, predicate: P) -> Vec<&Product>
    where
        P: Fn(&Product) -> bool,
    {
        self.products.iter().filter(|p| predicate(p)).collect()
    }

    /// Products whose name contains `query` ignoring case, or whose article number contains it
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let lower_query = query.to_lowercase();
        self.filter(|p| p.name.to_lowercase().contains(&lower_query) || p.id.contains(query))
    }

    /// Products of one category, in source order
    pub fn by_category(&self, category: Category) -> Vec<&Product> {
        self.filter(|p| p.category == category)
    }

    /// First product with the given article number
    pub fn find_by_id(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Append products, e.g. from a structured import
    pub fn extend<I>(&mut self, products: I)
    where
        I: IntoIterator<Item = Product>,
    {
        self.products.extend(products);
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Load and parse a catalog export from disk
pub fn load_catalog_file(path: impl AsRef<Path>) -> AppResult<ProductCatalog> {
    load_catalog_file_with(&CatalogParser::new(), path)
}

/// Load and parse a catalog export from disk with a specific parser
pub fn load_catalog_file_with(
    parser: &CatalogParser,
    path: impl AsRef<Path>,
) -> AppResult<ProductCatalog> {
    let path = path.as_ref();
    let span = crate::observability::catalog_span("load_catalog_file");
    let _enter = span.enter();

    let content = fs::read_to_string(path).map_err(|e| {
        AppError::Catalog(format!("failed to read catalog '{}': {}", path.display(), e))
    })?;

    let catalog = ProductCatalog::from_text_with(parser, &content);
    metrics::gauge!("catalog_products_loaded").set(catalog.len() as f64);
    info!(path = %path.display(), products = catalog.len(), "Loaded product catalog");
    Ok(catalog)
}

/// Load a catalog export, falling back to an empty catalog when the source is unreadable
pub fn load_catalog_or_empty(parser: &CatalogParser, path: impl AsRef<Path>) -> ProductCatalog {
    let path = path.as_ref();
    match load_catalog_file_with(parser, path) {
        Ok(catalog) => catalog,
        Err(e) => {
            error_logging::log_catalog_error(&e, "load_catalog", path.to_str());
            warn!("Continuing with an empty catalog");
            ProductCatalog::new()
        }
    }
}

/// Decode a structured product feed (a JSON array of product records)
///
/// Records are taken as-is: categories are not recomputed and codes are not re-validated.
pub fn import_products_json(payload: &str) -> AppResult<Vec<Product>> {
    let products: Vec<Product> = serde_json::from_str(payload)
        .map_err(|e| AppError::Import(format!("malformed product payload: {}", e)))?;
    info!(products = products.len(), "Decoded structured product import");
    Ok(products)
}

/// Read and decode a structured product feed from disk
pub fn load_import_file(path: impl AsRef<Path>) -> AppResult<Vec<Product>> {
    let path = path.as_ref();
    let payload = fs::read_to_string(path).map_err(|e| {
        AppError::Import(format!("failed to read import '{}': {}", path.display(), e))
    })?;

    import_products_json(&payload).inspect_err(|e| {
        error_logging::log_import_error(e, "load_import_file", path.to_str(), Some(payload.len()));
    })
}
