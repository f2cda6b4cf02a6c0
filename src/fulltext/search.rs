// src/fulltext/search.rs
// =============================================================================
// The query surface the bookmark api talks to.
//
// The gateway validates the request, hands it to whichever backend is active
// and returns bookmark ids in that backend's relevance order. Hydrating ids
// into full bookmarks is the caller's job.
//
// "Search unavailable" and "no matches" must stay distinguishable, so an
// empty query or a missing backend is an error, never an empty Vec.
// =============================================================================

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};

use super::{FulltextIndex, FulltextQuery, SearchRequest, SearchScope};

#[derive(Clone)]
pub struct SearchGateway {
    index: Option<Arc<dyn FulltextIndex>>,
}

impl SearchGateway {
    pub fn new(index: Arc<dyn FulltextIndex>) -> Self {
        Self { index: Some(index) }
    }

    /// A gateway with no fulltext backend; every search fails.
    pub fn disabled() -> Self {
        Self { index: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.index.is_some()
    }

    /// Ids of bookmarks matching every term of `query` within `scope`.
    ///
    /// Each call runs the query again; the result is a finished list.
    pub async fn search(&self, query: &str, scope: SearchScope) -> Result<Vec<i64>> {
        self.search_page(&SearchRequest::new(query, scope)).await
    }

    pub async fn search_page(&self, request: &SearchRequest) -> Result<Vec<i64>> {
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| Error::config("no fulltext backend is configured"))?;
        let query = FulltextQuery::parse(request)?;

        let ids = index.search(&query).await?;
        debug!(
            backend = %index.backend(),
            terms = ?query.terms,
            scope = ?query.scope,
            hits = ids.len(),
            "search"
        );
        Ok(ids)
    }
}

impl std::fmt::Debug for SearchGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchGateway")
            .field("backend", &self.index.as_ref().map(|i| i.backend()))
            .finish()
    }
}
