// src/fulltext/tags.rs
// =============================================================================
// The denormalized tag string.
//
// Tags live in a many-to-many relation owned by the bookmark layer; the
// fulltext surface needs them flattened into one text column (bmarks.tag_str).
// A TagString can only be built from a tag set, which keeps it a projection of
// that set rather than a second source of truth.
// =============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Space-joined, lowercased, de-duplicated and sorted tag names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TagString(String);

impl TagString {
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Tag names are single words; inner whitespace would split one tag
        // into two search terms, so it is folded away.
        let set: BTreeSet<String> = tags
            .into_iter()
            .map(|t| t.as_ref().split_whitespace().collect::<String>().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        TagString(set.into_iter().collect::<Vec<_>>().join(" "))
    }

    /// Parses the api form ("python search") into a tag string.
    pub fn parse(raw: &str) -> Self {
        Self::from_tags(raw.split_whitespace())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ').filter(|t| !t.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TagString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tags_is_canonical() {
        let a = TagString::from_tags(["search", "Python", "python"]);
        let b = TagString::from_tags(vec!["python".to_string(), "search".to_string()]);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "python search");
    }

    #[test]
    fn test_parse_api_form() {
        let tags = TagString::parse("  python   search ");
        assert_eq!(tags.tags().collect::<Vec<_>>(), vec!["python", "search"]);
    }

    #[test]
    fn test_empty() {
        assert!(TagString::from_tags(Vec::<String>::new()).is_empty());
        assert!(TagString::from_tags(["", "  "]).is_empty());
        assert_eq!(TagString::default().tags().count(), 0);
    }
}
