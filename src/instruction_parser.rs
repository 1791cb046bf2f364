//! # Instruction Parser
//!
//! Extracts structured cooking parameters from the free-form preparation text of
//! a catalog line, e.g. `"Im Kombidämpfer 180°C, KT 65, 45 Min"`.
//!
//! Each field is searched independently on the original text, so a missing or
//! malformed marker only leaves its own field empty:
//!
//! - **Cooking temperature**: digits directly before an optional space and `°C`
//! - **Core temperature**: digits directly after `KT` and an optional space
//! - **Duration**: digits (or a `NN-NN` range) before an optional space and `Min`,
//!   reported with a ` Min` suffix; a bare `Min` without digits yields
//!   [`UNSPECIFIED_DURATION`]

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Duration reported when the text mentions minutes without a number
pub const UNSPECIFIED_DURATION: &str = "Zeit n.A.";

/// Unit suffix appended to numeric durations
pub const DURATION_UNIT: &str = "Min";

lazy_static! {
    static ref COOKING_TEMP_REGEX: Regex =
        Regex::new(r"(\d+)\s?°C").expect("Cooking temperature pattern should be valid");
    static ref CORE_TEMP_REGEX: Regex =
        Regex::new(r"KT\s?(\d+)").expect("Core temperature pattern should be valid");
    static ref DURATION_REGEX: Regex =
        Regex::new(r"(\d+(?:-?\d+)?)\s?Min").expect("Duration pattern should be valid");
}

/// Cooking parameters derived from a preparation text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInstruction {
    /// Ambient cooking temperature in °C (e.g. "180")
    pub cooking_temp: Option<String>,
    /// Target core temperature in °C (e.g. "65")
    pub core_temp: Option<String>,
    /// The full preparation text, verbatim
    pub method: String,
    /// e.g. "45 Min", "10-12 Min" or [`UNSPECIFIED_DURATION`]
    pub duration: Option<String>,
}

/// Parse a preparation text into cooking parameters
///
/// Returns `None` only for empty text. Any non-empty text yields a value, even
/// when no marker is found, regardless of the product's category.
///
/// # Examples
///
/// ```rust
/// use zusatz_scanner::instruction_parser::parse_instruction;
///
/// let parsed = parse_instruction("180°C, KT 65, 45 Min").unwrap();
/// assert_eq!(parsed.cooking_temp.as_deref(), Some("180"));
/// assert_eq!(parsed.core_temp.as_deref(), Some("65"));
/// assert_eq!(parsed.duration.as_deref(), Some("45 Min"));
/// assert!(parse_instruction("").is_none());
/// ```
pub fn parse_instruction(text: &str) -> Option<ParsedInstruction> {
    if text.is_empty() {
        return None;
    }

    let parsed = ParsedInstruction {
        cooking_temp: first_capture(&COOKING_TEMP_REGEX, text),
        core_temp: first_capture(&CORE_TEMP_REGEX, text),
        method: text.to_string(),
        duration: extract_duration(text),
    };

    trace!(
        cooking_temp = ?parsed.cooking_temp,
        core_temp = ?parsed.core_temp,
        duration = ?parsed.duration,
        "Parsed preparation text"
    );
    Some(parsed)
}

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn extract_duration(text: &str) -> Option<String> {
    match first_capture(&DURATION_REGEX, text) {
        Some(minutes) => Some(format!("{} {}", minutes, DURATION_UNIT)),
        None if text.contains(DURATION_UNIT) => Some(UNSPECIFIED_DURATION.to_string()),
        None => None,
    }
}
