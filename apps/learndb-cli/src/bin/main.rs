use std::env;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use learndb_core::catalog::CatalogIndex;
use learndb_core::config::{Config, Settings};
use learndb_core::traits::{EmbedProvider, KeyValueStore};
use learndb_core::types::ContentKind;
use learndb_embed::get_default_provider;
use learndb_hybrid::{RelevanceEngine, FALLBACK_SCORE};
use learndb_vector::{EmbeddingStore, FileStore, RecentSearches, StoreOptions};

const USAGE: &str = "<search|recommend|analyze|suggest|history|status|clear-cache> [args...]";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() { eprintln!("Usage: {} {}", prog, USAGE); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn parse_limit(arg: Option<&String>, default: usize) -> anyhow::Result<usize> {
    match arg {
        Some(s) => s.parse().map_err(|e| anyhow::anyhow!("invalid limit '{}': {}", s, e)),
        None => Ok(default),
    }
}

/// Wire the engine from settings. The provider is built here, outside the
/// async runtime, because the HTTP provider uses a blocking client.
fn build_engine(settings: &Settings) -> anyhow::Result<RelevanceEngine> {
    let provider: Arc<dyn EmbedProvider> = Arc::from(get_default_provider(&settings.embedding)?);
    // Config files are read from the working directory; relative store dirs follow them.
    let store_dir = settings.storage.resolved_dir(&env::current_dir()?);
    let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&store_dir)?);
    tracing::debug!(dir = %store_dir.display(), "using key/value store");
    let catalog = Arc::new(CatalogIndex::seeded());
    let store = EmbeddingStore::new(catalog, provider, kv.clone(), StoreOptions::from_settings(settings));
    let history = RecentSearches::new(kv, settings.storage.history_key.clone(), settings.search.max_recent);
    Ok(RelevanceEngine::new(store, history))
}

async fn run(engine: &RelevanceEngine, settings: &Settings, cmd: &str, args: &[String]) -> anyhow::Result<()> {
    match cmd {
        "search" => {
            let Some(query) = args.first() else { eprintln!("Usage: learndb search \"<query>\" [limit]"); std::process::exit(1) };
            let limit = parse_limit(args.get(1), settings.search.default_limit)?;
            let results = engine.semantic_search(query, limit).await;
            if let Err(e) = engine.record_search(query) { tracing::warn!(error = %e, "failed to record search"); }
            if results.is_empty() { println!("No results for \"{}\"", query); }
            let degraded = !results.is_empty() && results.iter().all(|r| r.relevance_score == FALLBACK_SCORE);
            if degraded { println!("(keyword matches only; semantic ranking unavailable)"); }
            for r in &results {
                println!("{:>6.3}  [{}] {} ({})", r.relevance_score, r.kind, r.title, r.id);
            }
        }
        "recommend" => {
            let Some(anchor) = args.first() else { eprintln!("Usage: learndb recommend <item-id> [kind] [limit]"); std::process::exit(1) };
            let kind = match args.get(1) {
                Some(k) => k.parse::<ContentKind>()?,
                None => engine.catalog().get(anchor).map(|i| i.kind).unwrap_or(ContentKind::Lesson),
            };
            let limit = parse_limit(args.get(2), settings.search.default_limit)?;
            for r in engine.recommend(anchor, kind, limit).await {
                println!("{:>6.3}  [{}] {} ({}) - {}", r.confidence, r.kind, r.title, r.id, r.reason);
            }
        }
        "analyze" => {
            let query = args.join(" ");
            println!("{}", serde_json::to_string_pretty(&engine.analyze(&query))?);
        }
        "suggest" => {
            let partial = args.join(" ");
            for s in engine.suggest(&partial) { println!("{}", s); }
        }
        "history" => {
            for q in engine.recent_searches() { println!("{}", q); }
        }
        "status" => {
            engine.store().ensure_ready().await;
            println!("{}", serde_json::to_string_pretty(&engine.status())?);
        }
        "clear-cache" => {
            engine.clear_cache().await?;
            println!("Embedding cache cleared");
        }
        _ => { eprintln!("Unknown command: {}", cmd); std::process::exit(1); }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let (cmd, args) = parse_args();
    let engine = build_engine(&settings)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(&engine, &settings, &cmd, &args))
}
