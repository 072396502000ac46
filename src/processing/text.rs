//! Text cleaning helpers
//!
//! Cleaning trims leading/trailing whitespace, collapses internal runs of
//! whitespace to a single space, and strips non-whitespace control
//! characters. The operation is idempotent.

/// Cleans a single text value.
pub fn clean_text(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleans an optional text value, mapping empty results to `None`.
pub fn clean_optional(text: Option<&str>) -> Option<String> {
    text.map(clean_text).filter(|s| !s.is_empty())
}
