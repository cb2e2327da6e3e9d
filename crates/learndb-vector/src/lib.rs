//! Embedding storage for the learning catalog: key/value backends, the
//! persisted vector cache, the lazily built embedding index, similarity
//! ranking and recent-search history.

pub mod cache;
pub mod history;
pub mod kv;
pub mod similarity;
pub mod store;

pub use history::RecentSearches;
pub use kv::{FileStore, MemoryStore};
pub use similarity::cosine_similarity;
pub use store::{EmbeddedItem, EmbeddingIndex, EmbeddingSource, EmbeddingStore, StoreOptions};
