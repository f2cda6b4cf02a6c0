// src/fulltext/query.rs
// =============================================================================
// Search requests and the normalised query the backends execute.
//
// Every backend gets the same thing: a list of lowercase terms and a scope.
// The matching rule is the same everywhere too: each term has to appear in at
// least one field of the scope. Only the SQL spelling differs per backend.
//
// None of the backends stem, and words InnoDB refuses to index are dropped
// here, before any backend sees the query. Otherwise "the python" would need
// "the" to match on SQLite and PostgreSQL while MySQL ignores it.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One searchable field of a bookmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Description,
    Extended,
    Tags,
    Content,
}

impl SearchField {
    /// Column name shared by `bmarks`, `readable` and the sqlite fts table.
    pub fn column(self) -> &'static str {
        match self {
            SearchField::Description => "description",
            SearchField::Extended => "extended",
            SearchField::Tags => "tag_str",
            SearchField::Content => "content",
        }
    }
}

/// Which fields take part in a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// description, extended notes and tags
    Metadata,
    /// tags only
    Tags,
    /// extracted page content only
    Content,
    /// metadata plus content
    All,
}

impl SearchScope {
    /// Mirrors the `search_content` flag of the bookmark api.
    pub fn from_search_content(search_content: bool) -> Self {
        if search_content {
            SearchScope::All
        } else {
            SearchScope::Metadata
        }
    }

    pub fn fields(self) -> &'static [SearchField] {
        match self {
            SearchScope::Metadata => &[
                SearchField::Description,
                SearchField::Extended,
                SearchField::Tags,
            ],
            SearchScope::Tags => &[SearchField::Tags],
            SearchScope::Content => &[SearchField::Content],
            SearchScope::All => &[
                SearchField::Description,
                SearchField::Extended,
                SearchField::Tags,
                SearchField::Content,
            ],
        }
    }

    pub fn includes(self, field: SearchField) -> bool {
        self.fields().contains(&field)
    }
}

/// A search as the caller phrases it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub scope: SearchScope,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, scope: SearchScope) -> Self {
        Self {
            query: query.into(),
            scope,
            limit: None,
            offset: 0,
        }
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }
}

/// A validated request: at least one term, ready for a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulltextQuery {
    pub terms: Vec<String>,
    pub scope: SearchScope,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl FulltextQuery {
    pub fn parse(request: &SearchRequest) -> Result<Self> {
        let terms = terms(&request.query);
        if terms.is_empty() {
            return Err(Error::config(format!(
                "search query '{}' has no searchable terms",
                request.query
            )));
        }
        Ok(Self {
            terms,
            scope: request.scope,
            limit: request.limit,
            offset: request.offset,
        })
    }

    /// The terms joined back together, used for relevance ranking.
    pub fn joined(&self) -> String {
        self.terms.join(" ")
    }
}

/// InnoDB's default fulltext stopword list.
pub const STOPWORDS: &[&str] = &[
    "a", "about", "an", "are", "as", "at", "be", "by", "com", "de", "en", "for", "from", "how",
    "i", "in", "is", "it", "la", "of", "on", "or", "that", "the", "this", "to", "was", "what",
    "when", "where", "who", "will", "with", "und", "www",
];

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Splits free text into lowercase alphanumeric terms, first occurrence wins.
/// Stopwords are dropped.
pub fn terms(query: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in query.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let word = word.to_lowercase();
        if is_stopword(&word) {
            continue;
        }
        if !out.contains(&word) {
            out.push(word);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_are_normalised() {
        assert_eq!(terms("Python, search & PYTHON!"), vec!["python", "search"]);
        assert_eq!(terms("c++ rust-lang"), vec!["c", "rust", "lang"]);
        assert!(terms("  ,;!? ").is_empty());
    }

    #[test]
    fn test_stopwords_are_dropped() {
        assert_eq!(terms("The Python of the web"), vec!["python", "web"]);
        assert!(is_stopword("www"));
        assert!(!is_stopword("python"));

        let request = SearchRequest::new("the a of", SearchScope::All);
        assert!(matches!(
            FulltextQuery::parse(&request),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_empty_query_is_a_configuration_error() {
        let request = SearchRequest::new("   ", SearchScope::All);
        assert!(matches!(
            FulltextQuery::parse(&request),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_keeps_paging() {
        let request = SearchRequest::new("bmark", SearchScope::Tags).page(10, 20);
        let query = FulltextQuery::parse(&request).unwrap();
        assert_eq!(query.terms, vec!["bmark"]);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, 20);
    }

    #[test]
    fn test_scope_fields() {
        assert_eq!(SearchScope::from_search_content(true), SearchScope::All);
        assert_eq!(SearchScope::from_search_content(false), SearchScope::Metadata);
        assert!(SearchScope::All.includes(SearchField::Content));
        assert!(!SearchScope::Metadata.includes(SearchField::Content));
        assert_eq!(SearchScope::Tags.fields(), &[SearchField::Tags]);
    }
}
