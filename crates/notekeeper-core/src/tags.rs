//! Tag input parsing and normalization.
//!
//! Tags arrive as one free-text, comma-separated field. Each piece is
//! trimmed and lowercased; blank pieces are dropped and duplicates collapse,
//! so `"Work, work ,WORK"` yields the single tag `work`.

use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Maximum length of a normalized tag name, in characters.
pub const MAX_TAG_LENGTH: usize = 100;

/// Normalize a single tag: trim surrounding whitespace and lowercase.
///
/// Returns `None` for blank input.
///
/// ```
/// use notekeeper_core::normalize_tag;
///
/// assert_eq!(normalize_tag("  Errand "), Some("errand".to_string()));
/// assert_eq!(normalize_tag("   "), None);
/// ```
pub fn normalize_tag(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Deduplicated set of normalized tag names.
///
/// Names are kept sorted, so concurrent transactions upsert tag rows in the
/// same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    names: BTreeSet<String>,
}

impl TagSet {
    /// An empty tag set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a raw comma-separated tag string.
    ///
    /// Blank input yields an empty set. A normalized name longer than
    /// [`MAX_TAG_LENGTH`] characters is rejected with
    /// [`Error::InvalidInput`].
    pub fn parse(raw: &str) -> Result<Self> {
        let mut names = BTreeSet::new();
        for piece in raw.split(',') {
            let Some(name) = normalize_tag(piece) else {
                continue;
            };
            if name.chars().count() > MAX_TAG_LENGTH {
                return Err(Error::InvalidInput(format!(
                    "Tag must be {} characters or less",
                    MAX_TAG_LENGTH
                )));
            }
            names.insert(name);
        }
        Ok(Self { names })
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Iterate names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(set: &TagSet) -> Vec<&str> {
        set.iter().collect()
    }

    #[test]
    fn test_case_and_whitespace_variants_collapse() {
        let set = TagSet::parse("Work, work ,WORK").unwrap();
        assert_eq!(names(&set), vec!["work"]);
    }

    #[test]
    fn test_multiple_tags_are_sorted() {
        let set = TagSet::parse("food, errand").unwrap();
        assert_eq!(names(&set), vec!["errand", "food"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_blank_input_yields_empty_set() {
        assert!(TagSet::parse("").unwrap().is_empty());
        assert!(TagSet::parse("   ").unwrap().is_empty());
        assert!(TagSet::parse(" , ,, ").unwrap().is_empty());
    }

    #[test]
    fn test_blank_pieces_are_skipped() {
        let set = TagSet::parse("a,,b, ,").unwrap();
        assert_eq!(names(&set), vec!["a", "b"]);
    }

    #[test]
    fn test_inner_whitespace_is_preserved() {
        let set = TagSet::parse("  To Do  ").unwrap();
        assert!(set.contains("to do"));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = TagSet::parse("Rust, Async , rust").unwrap();
        let rejoined = first.iter().collect::<Vec<_>>().join(",");
        let second = TagSet::parse(&rejoined).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_overlong_tag_rejected() {
        let long = "x".repeat(MAX_TAG_LENGTH + 1);
        let result = TagSet::parse(&format!("ok, {}", long));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_max_length_tag_accepted() {
        let exact = "é".repeat(MAX_TAG_LENGTH);
        let set = TagSet::parse(&exact).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_unicode_lowercasing() {
        assert_eq!(normalize_tag("ÉTÉ"), Some("été".to_string()));
    }
}
