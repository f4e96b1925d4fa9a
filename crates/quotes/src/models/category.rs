//! Category filtering

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pseudo-category meaning "no filtering"
pub const ALL_CATEGORIES: &str = "all";

/// Compare two category labels case-insensitively
pub fn same_category(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Whether a label collides with the "all" pseudo-category
pub(crate) fn is_reserved_category(name: &str) -> bool {
    same_category(name.trim(), ALL_CATEGORIES)
}

/// A category filter as chosen by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryFilter {
    /// No filtering
    #[default]
    All,
    /// Only quotes whose category matches, ignoring case
    Named(String),
}

impl CategoryFilter {
    /// Parse user input; blank input and any casing of "all" mean no filtering
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || is_reserved_category(trimmed) {
            Self::All
        } else {
            Self::Named(trimmed.to_string())
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_CATEGORIES,
            Self::Named(name) => name,
        }
    }

    /// Whether a quote category passes this filter
    pub fn matches(&self, category: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => same_category(name, category),
        }
    }
}

impl From<String> for CategoryFilter {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for CategoryFilter {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        filter.as_str().to_string()
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_sentinel() {
        assert_eq!(CategoryFilter::parse("all"), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(" ALL "), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(""), CategoryFilter::All);
    }

    #[test]
    fn test_named_matches_ignoring_case() {
        let filter = CategoryFilter::parse("life");
        assert!(filter.matches("Life"));
        assert!(filter.matches("LIFE"));
        assert!(!filter.matches("Motivation"));
    }

    #[test]
    fn test_all_matches_everything() {
        assert!(CategoryFilter::All.matches("anything"));
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&CategoryFilter::parse("Life")).unwrap();
        assert_eq!(json, "\"Life\"");
        let filter: CategoryFilter = serde_json::from_str("\"all\"").unwrap();
        assert!(filter.is_all());
    }
}
