//! Embedding store: one vector per catalog item, produced once per session.
//!
//! `ensure_ready` resolves in this order: persisted cache (if it matches the
//! current catalog hash and embedder), one provider batch call, or
//! pseudo-embeddings when the provider fails. Initialisation runs under an
//! async mutex so concurrent callers share a single outcome; the finished
//! snapshot sits behind its own lock so readers never wait on a build.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;

use learndb_core::catalog::CatalogIndex;
use learndb_core::config::Settings;
use learndb_core::traits::{EmbedProvider, KeyValueStore};
use learndb_core::types::CatalogItem;
use learndb_embed::{retry_budget, PseudoEmbedder};

use crate::cache::{self, CacheEntry};

/// Where the vectors of an index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingSource {
    Provider,
    Cache,
    Pseudo,
}

#[derive(Debug, Clone)]
pub struct EmbeddedItem {
    pub item: CatalogItem,
    pub vector: Vec<f32>,
}

/// Immutable snapshot of embedded items in catalog order.
#[derive(Debug)]
pub struct EmbeddingIndex {
    items: Vec<EmbeddedItem>,
    positions: HashMap<String, usize>,
    source: EmbeddingSource,
    embedder_id: String,
}

impl EmbeddingIndex {
    fn new(items: Vec<EmbeddedItem>, source: EmbeddingSource, embedder_id: String) -> Self {
        let positions = items.iter().enumerate().map(|(i, e)| (e.item.id.clone(), i)).collect();
        Self { items, positions, source, embedder_id }
    }

    pub fn items(&self) -> &[EmbeddedItem] { &self.items }

    pub fn get(&self, id: &str) -> Option<&EmbeddedItem> { self.positions.get(id).map(|&i| &self.items[i]) }

    pub fn vector_for(&self, id: &str) -> Option<&[f32]> { self.get(id).map(|e| e.vector.as_slice()) }

    pub fn source(&self) -> EmbeddingSource { self.source }

    pub fn embedder_id(&self) -> &str { &self.embedder_id }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn dim(&self) -> usize { self.items.first().map(|e| e.vector.len()).unwrap_or(0) }
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Key of the persisted `{id -> vector}` entry.
    pub cache_key: String,
    /// Upper bound for a single provider call, retries included.
    pub provider_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self { Self { cache_key: "learndb.embeddings.v1".to_string(), provider_timeout: Duration::from_secs(10) } }
}

impl StoreOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            cache_key: settings.storage.cache_key.clone(),
            provider_timeout: retry_budget(Duration::from_secs(settings.embedding.timeout_secs), settings.embedding.max_retries),
        }
    }
}

pub struct EmbeddingStore {
    catalog: Arc<CatalogIndex>,
    provider: Arc<dyn EmbedProvider>,
    kv: Arc<dyn KeyValueStore>,
    pseudo: PseudoEmbedder,
    options: StoreOptions,
    init: Mutex<()>,
    ready: RwLock<Option<Arc<EmbeddingIndex>>>,
}

impl EmbeddingStore {
    pub fn new(catalog: Arc<CatalogIndex>, provider: Arc<dyn EmbedProvider>, kv: Arc<dyn KeyValueStore>, options: StoreOptions) -> Self {
        let pseudo = PseudoEmbedder::new(provider.dim());
        Self { catalog, provider, kv, pseudo, options, init: Mutex::new(()), ready: RwLock::new(None) }
    }

    pub fn catalog(&self) -> &CatalogIndex { &self.catalog }

    pub fn embedder_id(&self) -> &str { self.provider.embedder_id() }

    /// Build or load the index once; later calls return the same snapshot.
    pub async fn ensure_ready(&self) -> Arc<EmbeddingIndex> {
        if let Some(index) = self.current() {
            return index;
        }
        let _init = self.init.lock().await;
        if let Some(index) = self.current() {
            return index;
        }
        let index = Arc::new(self.build_index().await);
        *self.ready.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&index));
        index
    }

    /// The current snapshot, without triggering or waiting for initialisation.
    pub fn current(&self) -> Option<Arc<EmbeddingIndex>> { self.ready.read().unwrap_or_else(PoisonError::into_inner).clone() }

    pub fn vector_for(&self, id: &str) -> Option<Vec<f32>> {
        self.current()?.vector_for(id).map(<[f32]>::to_vec)
    }

    /// Drop the in-memory index and the persisted entry. The next
    /// `ensure_ready` regenerates from scratch.
    pub async fn invalidate(&self) -> Result<()> {
        let _init = self.init.lock().await;
        *self.ready.write().unwrap_or_else(PoisonError::into_inner) = None;
        cache::clear(self.kv.as_ref(), &self.options.cache_key)?;
        tracing::info!(key = %self.options.cache_key, "embedding cache invalidated");
        Ok(())
    }

    /// Embed a query through the provider (single-item batch).
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self.call_provider(vec![text.to_string()]).await?;
        vectors.into_iter().next().context("provider returned no vector for query")
    }

    pub fn pseudo_embed(&self, text: &str) -> Vec<f32> { self.pseudo.embed(text) }

    async fn build_index(&self) -> EmbeddingIndex {
        let catalog_hash = self.catalog.content_hash();
        let embedder_id = self.provider.embedder_id().to_string();

        if let Some(index) = self.load_cached(&catalog_hash, &embedder_id) {
            tracing::info!(items = index.len(), "embeddings loaded from cache");
            return index;
        }

        let items = self.catalog.all_items();
        if items.is_empty() {
            return EmbeddingIndex::new(Vec::new(), EmbeddingSource::Provider, embedder_id);
        }

        let texts: Vec<String> = items.iter().map(CatalogItem::embedding_text).collect();
        match self.call_provider(texts).await {
            Ok(vectors) => {
                let embedded: Vec<EmbeddedItem> =
                    items.iter().cloned().zip(vectors).map(|(item, vector)| EmbeddedItem { item, vector }).collect();
                let mapping = embedded.iter().map(|e| (e.item.id.clone(), e.vector.clone())).collect();
                let entry = CacheEntry::new(catalog_hash, embedder_id.clone(), mapping);
                if let Err(e) = cache::save(self.kv.as_ref(), &self.options.cache_key, &entry) {
                    tracing::warn!(error = %e, "failed to persist embeddings; continuing in memory");
                }
                tracing::info!(items = embedded.len(), embedder = %embedder_id, "embeddings generated by provider");
                EmbeddingIndex::new(embedded, EmbeddingSource::Provider, embedder_id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "embedding provider failed; using pseudo-embeddings");
                let embedded = items
                    .iter()
                    .map(|item| EmbeddedItem { item: item.clone(), vector: self.pseudo.embed(&format!("{}{}", item.title, item.body)) })
                    .collect();
                EmbeddingIndex::new(embedded, EmbeddingSource::Pseudo, embedder_id)
            }
        }
    }

    fn load_cached(&self, catalog_hash: &str, embedder_id: &str) -> Option<EmbeddingIndex> {
        let key = self.options.cache_key.as_str();
        let mut entry = cache::load(self.kv.as_ref(), key)?;
        if entry.vectors.is_empty() {
            return None;
        }
        if !entry.matches(catalog_hash, embedder_id) {
            tracing::info!(key, cached_embedder = %entry.embedder_id, "embedding cache is stale; regenerating");
            return None;
        }
        let dim = self.provider.dim();
        let mut embedded = Vec::with_capacity(self.catalog.len());
        for item in self.catalog.all_items() {
            match entry.vectors.remove(&item.id) {
                Some(vector) if vector.len() == dim => embedded.push(EmbeddedItem { item: item.clone(), vector }),
                _ => {
                    tracing::warn!(key, id = %item.id, "embedding cache incomplete; regenerating");
                    return None;
                }
            }
        }
        Some(EmbeddingIndex::new(embedded, EmbeddingSource::Cache, embedder_id.to_string()))
    }

    async fn call_provider(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        let dim = self.provider.dim();
        let provider = Arc::clone(&self.provider);
        let task = tokio::task::spawn_blocking(move || provider.embed_batch(&texts));
        let vectors = match tokio::time::timeout(self.options.provider_timeout, task).await {
            Ok(joined) => joined.context("embedding task failed")??,
            Err(_) => anyhow::bail!("embedding provider timed out after {:?}", self.options.provider_timeout),
        };
        check_batch(&vectors, expected, dim)?;
        Ok(vectors)
    }
}

/// Vectors are zipped onto inputs by position, so a short or ragged batch
/// cannot be used at all.
fn check_batch(vectors: &[Vec<f32>], expected: usize, dim: usize) -> Result<()> {
    anyhow::ensure!(vectors.len() == expected, "provider returned {} vectors for {} inputs", vectors.len(), expected);
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        anyhow::bail!("provider returned a {}-dim vector, expected {}", bad.len(), dim);
    }
    Ok(())
}
