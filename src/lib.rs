//! # Zusatz Scanner
//!
//! Ingests a supplier's semicolon-delimited product export, classifies each
//! product, extracts cooking parameters from its preparation text and matches
//! camera-recognized text or barcodes against the catalog.

pub mod catalog;
pub mod circuit_breaker;
pub mod classification;
pub mod config;
pub mod errors;
pub mod instruction_parser;
pub mod lookup;
pub mod observability;
pub mod observability_config;
pub mod product;
pub mod scan_session;
pub mod text_matcher;

// Re-export types for easier access
pub use catalog::{parse_catalog, parse_line, CatalogParser, ProductCatalog};
pub use classification::classify;
pub use instruction_parser::{parse_instruction, ParsedInstruction};
pub use product::{Category, Product};
pub use scan_session::{ScanSession, ViewFilter};
pub use text_matcher::find_first_match;
