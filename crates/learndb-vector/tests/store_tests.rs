use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use learndb_core::catalog::CatalogIndex;
use learndb_core::traits::{EmbedProvider, KeyValueStore};
use learndb_core::types::{CatalogItem, ContentKind};
use learndb_embed::PseudoEmbedder;
use learndb_vector::cache::{self, CacheEntry};
use learndb_vector::{EmbeddingSource, EmbeddingStore, FileStore, MemoryStore, StoreOptions};

const KEY: &str = "test.embeddings";

struct CountingProvider {
    calls: AtomicUsize,
    delay: Duration,
    fail: bool,
    drop_last: bool,
}

impl CountingProvider {
    fn ok() -> Self { Self { calls: AtomicUsize::new(0), delay: Duration::ZERO, fail: false, drop_last: false } }
    fn slow(delay: Duration) -> Self { Self { delay, ..Self::ok() } }
    fn failing() -> Self { Self { fail: true, ..Self::ok() } }
    fn short() -> Self { Self { drop_last: true, ..Self::ok() } }
    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl EmbedProvider for CountingProvider {
    fn embedder_id(&self) -> &str { "counting:d3" }
    fn dim(&self) -> usize { 3 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() { std::thread::sleep(self.delay); }
        if self.fail { anyhow::bail!("quota exceeded"); }
        let mut out: Vec<Vec<f32>> = texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                vec![if t.contains("dna") { 1.0 } else { 0.0 }, if t.contains("protein") { 1.0 } else { 0.0 }, 0.25]
            })
            .collect();
        if self.drop_last { out.pop(); }
        Ok(out)
    }
}

fn item(id: &str, title: &str, body: &str) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        kind: ContentKind::Lesson,
        category: Some("genetics".to_string()),
        difficulty: None,
        description: None,
    }
}

fn catalog() -> Arc<CatalogIndex> {
    Arc::new(
        CatalogIndex::from_items(vec![
            item("dna", "DNA", "The double helix"),
            item("protein", "Proteins", "Folding protein chains"),
            item("cells", "Cells", "Units of life"),
        ])
        .unwrap(),
    )
}

fn options() -> StoreOptions { StoreOptions { cache_key: KEY.to_string(), provider_timeout: Duration::from_secs(5) } }

fn store_with(provider: Arc<CountingProvider>, kv: Arc<dyn KeyValueStore>) -> EmbeddingStore {
    EmbeddingStore::new(catalog(), provider, kv, options())
}

#[tokio::test]
async fn concurrent_ensure_ready_calls_provider_once() {
    let provider = Arc::new(CountingProvider::slow(Duration::from_millis(50)));
    let store = store_with(provider.clone(), Arc::new(MemoryStore::new()));

    let (a, b, c, d) = tokio::join!(store.ensure_ready(), store.ensure_ready(), store.ensure_ready(), store.ensure_ready());

    assert_eq!(provider.calls(), 1, "one batch call for all concurrent callers");
    assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c) && Arc::ptr_eq(&c, &d), "callers share one outcome");
    assert_eq!(a.source(), EmbeddingSource::Provider);
    assert_eq!(a.len(), 3);
}

#[tokio::test]
async fn readers_do_not_wait_for_inflight_initialisation() {
    let provider = Arc::new(CountingProvider::slow(Duration::from_millis(500)));
    let store = Arc::new(store_with(provider.clone(), Arc::new(MemoryStore::new())));

    let building = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.ensure_ready().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = std::time::Instant::now();
    assert!(store.current().is_none());
    assert!(store.vector_for("dna").is_none());
    assert!(started.elapsed() < Duration::from_millis(100), "reads returned while the build was running");

    let index = building.await.unwrap();
    assert!(Arc::ptr_eq(&index, &store.current().unwrap()));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn provider_vectors_are_zipped_in_catalog_order_and_persisted() {
    let provider = Arc::new(CountingProvider::ok());
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let store = store_with(provider.clone(), kv.clone());

    assert!(store.vector_for("dna").is_none(), "nothing before ensure_ready");
    let index = store.ensure_ready().await;
    assert_eq!(store.vector_for("dna"), Some(vec![1.0, 0.0, 0.25]));
    assert_eq!(index.vector_for("protein"), Some(&[0.0, 1.0, 0.25][..]));
    assert!(index.vector_for("unknown").is_none());

    let persisted = cache::load(kv.as_ref(), KEY).expect("cache persisted");
    assert_eq!(persisted.catalog_hash, catalog().content_hash());
    assert_eq!(persisted.embedder_id, "counting:d3");
    assert_eq!(persisted.vectors.len(), 3);
}

#[tokio::test]
async fn second_session_adopts_persisted_cache() {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let first = Arc::new(CountingProvider::ok());
    let original = store_with(first.clone(), kv.clone()).ensure_ready().await;

    let second = Arc::new(CountingProvider::ok());
    let reloaded = store_with(second.clone(), kv.clone()).ensure_ready().await;

    assert_eq!(second.calls(), 0, "no network call when the cache is valid");
    assert_eq!(reloaded.source(), EmbeddingSource::Cache);
    for e in original.items() {
        assert_eq!(reloaded.vector_for(&e.item.id), Some(e.vector.as_slice()));
    }
}

#[tokio::test]
async fn provider_failure_falls_back_to_pseudo_without_persisting() {
    let provider = Arc::new(CountingProvider::failing());
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let store = store_with(provider.clone(), kv.clone());

    let index = store.ensure_ready().await;
    assert_eq!(provider.calls(), 1);
    assert_eq!(index.source(), EmbeddingSource::Pseudo);
    assert_eq!(index.len(), 3);
    let expected = PseudoEmbedder::new(3).embed("DNAThe double helix");
    assert_eq!(index.vector_for("dna"), Some(expected.as_slice()));
    assert!(kv.get(KEY).unwrap().is_none(), "pseudo embeddings are never persisted");

    store.ensure_ready().await;
    assert_eq!(provider.calls(), 1, "fallback outcome is memoized too");
}

#[tokio::test]
async fn short_batch_is_treated_as_provider_failure() {
    let provider = Arc::new(CountingProvider::short());
    let store = store_with(provider, Arc::new(MemoryStore::new()));
    let index = store.ensure_ready().await;
    assert_eq!(index.source(), EmbeddingSource::Pseudo);
    assert_eq!(index.len(), 3, "every item still has a vector");
}

#[tokio::test]
async fn slow_provider_times_out_into_fallback() {
    let provider = Arc::new(CountingProvider::slow(Duration::from_millis(300)));
    let opts = StoreOptions { cache_key: KEY.to_string(), provider_timeout: Duration::from_millis(20) };
    let store = EmbeddingStore::new(catalog(), provider, Arc::new(MemoryStore::new()), opts);
    let index = store.ensure_ready().await;
    assert_eq!(index.source(), EmbeddingSource::Pseudo);
    assert!(store.embed_query("dna").await.is_err(), "query calls are bounded too");
}

#[tokio::test]
async fn corrupt_cache_is_discarded_and_regenerated() {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    kv.set(KEY, "{not json").unwrap();
    let provider = Arc::new(CountingProvider::ok());
    let index = store_with(provider.clone(), kv.clone()).ensure_ready().await;

    assert_eq!(provider.calls(), 1);
    assert_eq!(index.source(), EmbeddingSource::Provider);
    assert!(cache::load(kv.as_ref(), KEY).is_some(), "fresh cache written back");
}

#[tokio::test]
async fn stale_catalog_hash_forces_regeneration() {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let vectors: HashMap<String, Vec<f32>> =
        ["dna", "protein", "cells"].iter().map(|id| (id.to_string(), vec![9.0, 9.0, 9.0])).collect();
    cache::save(kv.as_ref(), KEY, &CacheEntry::new("old-catalog", "counting:d3", vectors)).unwrap();

    let provider = Arc::new(CountingProvider::ok());
    let index = store_with(provider.clone(), kv).ensure_ready().await;
    assert_eq!(provider.calls(), 1);
    assert_eq!(index.vector_for("dna"), Some(&[1.0, 0.0, 0.25][..]));
}

#[tokio::test]
async fn invalidate_clears_memory_and_persistence() {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let provider = Arc::new(CountingProvider::ok());
    let store = store_with(provider.clone(), kv.clone());
    store.ensure_ready().await;

    store.invalidate().await.unwrap();
    assert!(store.current().is_none());
    assert!(kv.get(KEY).unwrap().is_none());

    store.ensure_ready().await;
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn query_embedding_uses_single_item_batch() {
    let provider = Arc::new(CountingProvider::ok());
    let store = store_with(provider.clone(), Arc::new(MemoryStore::new()));
    let v = store.embed_query("What is DNA?").await.unwrap();
    assert_eq!(v, vec![1.0, 0.0, 0.25]);
    assert_eq!(provider.calls(), 1);
}

#[test]
fn cache_round_trip_through_file_store_is_exact() {
    let tmp = tempfile::TempDir::new().unwrap();
    let kv = FileStore::open(tmp.path().join("kv")).unwrap();
    let mut vectors = HashMap::new();
    vectors.insert("a".to_string(), vec![0.5f32, -0.25, 1.0, 0.0, 1e-7, -0.099_833_42]);
    vectors.insert("b".to_string(), vec![0.1f32, 0.2, 0.3]);
    let entry = CacheEntry::new("hash", "embedder", vectors.clone());

    cache::save(&kv, KEY, &entry).unwrap();
    let loaded = cache::load(&kv, KEY).expect("entry");

    for (id, v) in &vectors {
        let got = &loaded.vectors[id];
        let want_bits: Vec<u32> = v.iter().map(|x| x.to_bits()).collect();
        let got_bits: Vec<u32> = got.iter().map(|x| x.to_bits()).collect();
        assert_eq!(got_bits, want_bits, "vector {id} survives byte-for-byte");
    }
    assert_eq!(loaded.stored_at, entry.stored_at);
}

#[test]
fn file_store_missing_keys_and_removal() {
    let tmp = tempfile::TempDir::new().unwrap();
    let kv = FileStore::open(tmp.path()).unwrap();
    assert!(kv.get("absent").unwrap().is_none());
    kv.remove("absent").unwrap();
    kv.set("some/key", "value").unwrap();
    assert_eq!(kv.get("some/key").unwrap().as_deref(), Some("value"));
    kv.remove("some/key").unwrap();
    assert!(kv.get("some/key").unwrap().is_none());
}

#[test]
fn file_store_keeps_similar_keys_apart() {
    let tmp = tempfile::TempDir::new().unwrap();
    let kv = FileStore::open(tmp.path()).unwrap();
    kv.set("a/b", "slash").unwrap();
    kv.set("a_b", "underscore").unwrap();
    kv.set("a%2Fb", "literal").unwrap();
    assert_eq!(kv.get("a/b").unwrap().as_deref(), Some("slash"));
    assert_eq!(kv.get("a_b").unwrap().as_deref(), Some("underscore"));
    assert_eq!(kv.get("a%2Fb").unwrap().as_deref(), Some("literal"));

    kv.set("a/b", "rewritten").unwrap();
    assert_eq!(kv.get("a/b").unwrap().as_deref(), Some("rewritten"));
    let files = std::fs::read_dir(tmp.path()).unwrap().count();
    assert_eq!(files, 3, "no temp files left behind");
}

#[test]
fn provider_timeout_leaves_room_for_http_retries() {
    let mut settings = learndb_core::config::Settings::default();
    settings.embedding.timeout_secs = 10;
    settings.embedding.max_retries = 2;
    let opts = StoreOptions::from_settings(&settings);
    assert!(opts.provider_timeout > Duration::from_secs(30), "outer bound exceeds three request timeouts");

    settings.embedding.max_retries = 0;
    assert_eq!(StoreOptions::from_settings(&settings).provider_timeout, Duration::from_secs(10));
}
