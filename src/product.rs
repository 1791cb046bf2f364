//! # Product Model
//!
//! The canonical product record shared by the catalog, the text matcher and the
//! external lookup, together with the category taxonomy and the allergen and
//! additive label tables used when presenting a product.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::instruction_parser::{self, ParsedInstruction};

/// Supplier recorded for catalog lines that carry no supplier column
pub const DEFAULT_SUPPLIER: &str = "Seubert";

/// Marker contained in the supplier of products sourced from an external lookup
pub const EXTERNAL_SUPPLIER_MARKER: &str = "Extern";

/// Preparation-style taxonomy of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Appetizer,
    Meat,
    Fish,
    Poultry,
    Veggie,
    Dessert,
}

impl Category {
    /// All categories in declaration order
    pub const ALL: [Category; 6] = [
        Category::Appetizer,
        Category::Meat,
        Category::Fish,
        Category::Poultry,
        Category::Veggie,
        Category::Dessert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Appetizer => "appetizer",
            Category::Meat => "meat",
            Category::Fish => "fish",
            Category::Poultry => "poultry",
            Category::Veggie => "veggie",
            Category::Dessert => "dessert",
        }
    }

    /// Meat, poultry and fish are served as main courses
    pub fn is_main_course(&self) -> bool {
        matches!(self, Category::Meat | Category::Poultry | Category::Fish)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = crate::errors::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| crate::errors::AppError::Validation(format!("unknown category '{}'", s)))
    }
}

/// A supplier product, built once from a catalog line or an external lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Supplier article number (or barcode for externally sourced products)
    pub id: String,
    /// Display name
    pub name: String,
    pub category: Category,
    /// Uppercase allergen tokens in source order
    pub allergen_codes: Vec<String>,
    /// Numeric additive codes in source order
    pub additive_codes: Vec<i64>,
    pub supplier: String,
    /// Unprocessed preparation text, may be empty
    pub raw_instruction: String,
}

impl Product {
    /// Structured cooking parameters, derived from `raw_instruction` on every call
    ///
    /// Returns `None` only when the instruction text is empty.
    pub fn cooking_instruction(&self) -> Option<ParsedInstruction> {
        instruction_parser::parse_instruction(&self.raw_instruction)
    }

    /// Whether the product came from the external lookup rather than the catalog
    pub fn is_external(&self) -> bool {
        self.supplier.contains(EXTERNAL_SUPPLIER_MARKER)
    }

    /// Whether no allergen is declared
    pub fn is_allergen_free(&self) -> bool {
        self.allergen_codes.is_empty()
    }

    /// Allergen codes rendered as `"CODE (Name)"`, or the bare code when unknown
    pub fn allergen_labels(&self) -> Vec<String> {
        self.allergen_codes
            .iter()
            .map(|code| match allergen_name(code) {
                Some(name) => format!("{} ({})", code, name),
                None => code.clone(),
            })
            .collect()
    }

    /// Additive codes rendered as `"CODE (Name)"`, or the bare code when unknown
    pub fn additive_labels(&self) -> Vec<String> {
        self.additive_codes
            .iter()
            .map(|code| match additive_name(*code) {
                Some(name) => format!("{} ({})", code, name),
                None => code.to_string(),
            })
            .collect()
    }
}

const ALLERGENS: &[(&str, &str)] = &[
    ("A", "Gluten"),
    ("C", "Eier"),
    ("D", "Fisch"),
    ("F", "Soja"),
    ("G", "Milch"),
    ("I", "Sellerie"),
    ("J", "Senf"),
    ("K", "Sesam"),
    ("L", "Sulfite"),
    ("M", "Lupinen"),
    ("N", "Weichtiere"),
];

const ADDITIVES: &[(i64, &str)] = &[
    (1, "mit Farbstoff"),
    (2, "mit Konservierungsstoff"),
    (3, "Antioxidationsmittel"),
    (4, "Geschmacksverstärker"),
    (8, "mit Phosphat"),
];

/// Human-readable name of an allergen code
pub fn allergen_name(code: &str) -> Option<&'static str> {
    ALLERGENS
        .iter()
        .find(|(key, _)| *key == code)
        .map(|(_, name)| *name)
}

/// Human-readable name of an additive code
pub fn additive_name(code: i64) -> Option<&'static str> {
    ADDITIVES
        .iter()
        .find(|(key, _)| *key == code)
        .map(|(_, name)| *name)
}
