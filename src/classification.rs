//! # Category Classification
//!
//! Maps a catalog article number and product name onto the fixed category
//! taxonomy. Article numbers carry a coarse department code in their leading
//! digits; name keywords cover products whose code is ambiguous or missing.
//!
//! Rules are checked in priority order and the first hit wins:
//!
//! | Priority | Article number | Name keywords | Category |
//! |----------|----------------|---------------|----------|
//! | 1 | `22…` | `apfel`, `küchle` | dessert |
//! | 2 | `2…` (not `22…`) | `hähnchen`, `pute` | poultry |
//! | 3 | `18…` | `fisch`, `lachs` | fish |
//! | 4 | `19…` | `zucchini`, `linse` | veggie |
//! | - | anything else | | meat |
//!
//! `appetizer` is never produced here; only externally supplied products carry it.

use crate::product::Category;
use tracing::trace;

struct Rule {
    category: Category,
    matches_prefix: fn(&str) -> bool,
    keywords: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        category: Category::Dessert,
        matches_prefix: |id| id.starts_with("22"),
        keywords: &["apfel", "küchle"],
    },
    Rule {
        category: Category::Poultry,
        matches_prefix: |id| id.starts_with('2') && !id.starts_with("22"),
        keywords: &["hähnchen", "pute"],
    },
    Rule {
        category: Category::Fish,
        matches_prefix: |id| id.starts_with("18"),
        keywords: &["fisch", "lachs"],
    },
    Rule {
        category: Category::Veggie,
        matches_prefix: |id| id.starts_with("19"),
        keywords: &["zucchini", "linse"],
    },
];

/// Classify a product by article number and name
///
/// Total and deterministic: every input yields exactly one category, falling
/// back to [`Category::Meat`].
///
/// # Examples
///
/// ```rust
/// use zusatz_scanner::classification::classify;
/// use zusatz_scanner::product::Category;
///
/// assert_eq!(classify("2204", "Vanillepudding"), Category::Dessert);
/// assert_eq!(classify("9001", "Putenschnitzel"), Category::Poultry);
/// assert_eq!(classify("9001", "Rinderfilet"), Category::Meat);
/// ```
pub fn classify(id: &str, name: &str) -> Category {
    let lower_name = name.to_lowercase();

    let category = RULES
        .iter()
        .find(|rule| {
            (rule.matches_prefix)(id) || rule.keywords.iter().any(|k| lower_name.contains(k))
        })
        .map(|rule| rule.category)
        .unwrap_or(Category::Meat);

    trace!(id = %id, name = %name, category = %category, "Classified product");
    category
}
