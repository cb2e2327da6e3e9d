//! Recent search history: most-recent-first, deduplicated, capped.

use anyhow::{Context, Result};
use std::sync::Arc;

use learndb_core::traits::KeyValueStore;

pub struct RecentSearches {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    capacity: usize,
}

impl RecentSearches {
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>, capacity: usize) -> Self {
        Self { kv, key: key.into(), capacity }
    }

    /// Stored queries, newest first. Unreadable or corrupt data reads as empty
    /// (and corrupt data is cleared).
    pub fn list(&self) -> Vec<String> {
        let raw = match self.kv.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "recent searches unreadable");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(mut entries) => {
                entries.truncate(self.capacity);
                entries
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "recent searches corrupt; clearing");
                if let Err(e) = self.kv.remove(&self.key) {
                    tracing::warn!(key = %self.key, error = %e, "failed to clear recent searches");
                }
                Vec::new()
            }
        }
    }

    /// Move `query` to the front of the history and return the new list.
    /// Blank queries are ignored.
    pub fn record(&self, query: &str) -> Result<Vec<String>> {
        let query = query.trim();
        let mut entries = self.list();
        if query.is_empty() {
            return Ok(entries);
        }
        entries.retain(|q| q != query);
        entries.insert(0, query.to_string());
        entries.truncate(self.capacity);
        let raw = serde_json::to_string(&entries).context("failed to serialize recent searches")?;
        self.kv.set(&self.key, &raw)?;
        Ok(entries)
    }

    pub fn clear(&self) -> Result<()> { self.kv.remove(&self.key) }
}
