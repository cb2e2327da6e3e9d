//! Persisted embedding cache keyed by item id.
//!
//! One key/value entry holds the whole `{id -> vector}` mapping, stamped
//! with the catalog content hash and the embedder id it was produced under.
//! Unparseable entries are removed and reported as absent.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use learndb_core::traits::KeyValueStore;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub catalog_hash: String,
    pub embedder_id: String,
    /// Milliseconds since the Unix epoch.
    pub stored_at: i64,
    pub vectors: HashMap<String, Vec<f32>>,
}

impl CacheEntry {
    pub fn new(catalog_hash: impl Into<String>, embedder_id: impl Into<String>, vectors: HashMap<String, Vec<f32>>) -> Self {
        Self {
            catalog_hash: catalog_hash.into(),
            embedder_id: embedder_id.into(),
            stored_at: Utc::now().timestamp_millis(),
            vectors,
        }
    }

    /// Whether this entry was produced for `catalog_hash` by `embedder_id`.
    pub fn matches(&self, catalog_hash: &str, embedder_id: &str) -> bool {
        self.catalog_hash == catalog_hash && self.embedder_id == embedder_id
    }
}

pub fn load(store: &dyn KeyValueStore, key: &str) -> Option<CacheEntry> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "embedding cache unreadable; ignoring");
            return None;
        }
    };
    match serde_json::from_str::<CacheEntry>(&raw) {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::warn!(key, error = %e, "embedding cache corrupt; discarding");
            if let Err(e) = store.remove(key) {
                tracing::warn!(key, error = %e, "failed to discard corrupt embedding cache");
            }
            None
        }
    }
}

pub fn save(store: &dyn KeyValueStore, key: &str, entry: &CacheEntry) -> Result<()> {
    let raw = serde_json::to_string(entry).context("failed to serialize embedding cache")?;
    store.set(key, &raw)
}

pub fn clear(store: &dyn KeyValueStore, key: &str) -> Result<()> { store.remove(key) }
