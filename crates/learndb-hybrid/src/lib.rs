//! The relevance engine: semantic search, recommendations, query analysis
//! and suggestions over the learning catalog.
//!
//! Every operation returns a usable result. Provider failures degrade to
//! substring matching (search) or pseudo-embeddings (index build); unknown
//! anchors degrade to a category/kind filter (recommendations).

use anyhow::Result;
use rand::RngCore;
use serde::Serialize;

use learndb_core::catalog::CatalogIndex;
use learndb_core::types::{CatalogItem, ContentKind, QueryAnalysis, Recommendation, SearchResult};
use learndb_vector::similarity::rank;
use learndb_vector::{EmbeddingSource, EmbeddingStore, RecentSearches};

pub mod analysis;
pub mod reasons;
pub mod suggest;

use reasons::ReasonPicker;

/// Placeholder score of the substring fallback and the category/kind
/// recommendation filter. Callers distinguish degraded results by it.
pub const FALLBACK_SCORE: f32 = 0.5;

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub ready: bool,
    pub source: Option<EmbeddingSource>,
    pub items: usize,
    pub dimension: usize,
    pub embedder_id: String,
}

pub struct RelevanceEngine {
    store: EmbeddingStore,
    history: RecentSearches,
    reasons: ReasonPicker,
}

impl RelevanceEngine {
    pub fn new(store: EmbeddingStore, history: RecentSearches) -> Self {
        Self { store, history, reasons: ReasonPicker::from_entropy() }
    }

    /// Replace the random source used for low-similarity reasons.
    pub fn with_reason_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.reasons = ReasonPicker::with_rng(rng);
        self
    }

    pub fn catalog(&self) -> &CatalogIndex { self.store.catalog() }

    pub fn store(&self) -> &EmbeddingStore { &self.store }

    /// Rank catalog items by similarity to `query`, best first, at most `limit`.
    pub async fn semantic_search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }
        let index = self.store.ensure_ready().await;
        if index.is_empty() {
            return self.fallback_search(query, limit);
        }

        // A pseudo index only compares meaningfully with a pseudo query.
        let query_vec = match index.source() {
            EmbeddingSource::Pseudo => self.store.pseudo_embed(query),
            EmbeddingSource::Provider | EmbeddingSource::Cache => match self.store.embed_query(query).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "query embedding failed; using substring fallback");
                    return self.fallback_search(query, limit);
                }
            },
        };

        let ranked = rank(&query_vec, index.items().iter().map(|e| (&e.item, e.vector.as_slice())));
        tracing::debug!(query, candidates = ranked.len(), "semantic search ranked");
        ranked.into_iter().take(limit).map(|(item, score)| SearchResult::from_item(item, score)).collect()
    }

    /// Case-insensitive substring filter in catalog order. Every hit scores
    /// [`FALLBACK_SCORE`]; this is a filter, not a ranking.
    pub fn fallback_search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.catalog()
            .all_items()
            .iter()
            .filter(|item| {
                let title = item.title.to_lowercase();
                title.contains(&needle) || item.body.to_lowercase().contains(&needle) || needle.contains(&title)
            })
            .take(limit)
            .map(|item| SearchResult::from_item(item, FALLBACK_SCORE))
            .collect()
    }

    /// Items most similar to the anchor, never including the anchor itself.
    pub async fn recommend(&self, anchor_id: &str, anchor_kind: ContentKind, limit: usize) -> Vec<Recommendation> {
        if limit == 0 {
            return Vec::new();
        }
        let index = self.store.ensure_ready().await;
        let Some(anchor_vec) = index.vector_for(anchor_id) else {
            tracing::debug!(anchor_id, "anchor has no embedding; using category/kind filter");
            return self.fallback_recommendations(anchor_id, anchor_kind, limit);
        };

        let others = index.items().iter().filter(|e| e.item.id != anchor_id).map(|e| (&e.item, e.vector.as_slice()));
        rank(anchor_vec, others)
            .into_iter()
            .take(limit)
            .map(|(item, similarity)| Recommendation::from_item(item, self.reasons.reason_for(similarity), similarity))
            .collect()
    }

    /// Items sharing the anchor's category or matching `anchor_kind`, in
    /// catalog order. An unknown anchor contributes no category.
    pub fn fallback_recommendations(&self, anchor_id: &str, anchor_kind: ContentKind, limit: usize) -> Vec<Recommendation> {
        let anchor_category = self.catalog().get(anchor_id).and_then(|a| a.category.as_deref());
        self.catalog()
            .all_items()
            .iter()
            .filter(|item| item.id != anchor_id)
            .filter(|item| item.kind == anchor_kind || (anchor_category.is_some() && item.category.as_deref() == anchor_category))
            .take(limit)
            .map(|item| Recommendation::from_item(item, related_reason(item), FALLBACK_SCORE))
            .collect()
    }

    pub fn analyze(&self, query: &str) -> QueryAnalysis { analysis::analyze(query) }

    pub fn suggest(&self, partial: &str) -> Vec<String> { suggest::suggest(partial) }

    pub fn recent_searches(&self) -> Vec<String> { self.history.list() }

    pub fn record_search(&self, query: &str) -> Result<Vec<String>> { self.history.record(query) }

    pub fn clear_history(&self) -> Result<()> { self.history.clear() }

    pub fn status(&self) -> EngineStatus {
        let current = self.store.current();
        EngineStatus {
            ready: current.is_some(),
            source: current.as_ref().map(|i| i.source()),
            items: self.catalog().len(),
            dimension: current.as_ref().map(|i| i.dim()).unwrap_or(0),
            embedder_id: self.store.embedder_id().to_string(),
        }
    }

    pub async fn clear_cache(&self) -> Result<()> { self.store.invalidate().await }
}

fn related_reason(item: &CatalogItem) -> String {
    format!("Related {} in {}", item.kind, item.category.as_deref().unwrap_or("general"))
}
