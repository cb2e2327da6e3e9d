use anyhow::{anyhow, Result};
use std::hash::Hasher;
use std::time::Duration;
use twox_hash::XxHash64;

use learndb_core::config::EmbeddingSettings;
use learndb_core::traits::EmbedProvider;

pub mod remote;

pub use remote::{retry_budget, OpenAiProvider};

/// Amplitude of every pseudo-embedding component.
pub const PSEUDO_SCALE: f32 = 0.1;

/// Deterministic stand-in for a real embedding model.
///
/// The text is hashed to an integer seed and component `i` is
/// `sin(seed + i) * PSEUDO_SCALE`. Identical text always yields an identical
/// vector; the vectors carry no semantic signal.
#[derive(Debug, Clone, Copy)]
pub struct PseudoEmbedder {
    dim: usize,
}

impl PseudoEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim } }

    pub fn dim(&self) -> usize { self.dim }

    pub fn seed_for(text: &str) -> u32 {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(text.as_bytes());
        hasher.finish() as u32
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let seed = f64::from(Self::seed_for(text));
        (0..self.dim).map(|i| ((seed + i as f64).sin() as f32) * PSEUDO_SCALE).collect()
    }
}

/// Provider backed by [`PseudoEmbedder`]; never fails.
pub struct PseudoProvider {
    inner: PseudoEmbedder,
    id: String,
}

impl PseudoProvider {
    pub fn new(dim: usize) -> Self { Self { inner: PseudoEmbedder::new(dim), id: format!("pseudo:sin:d{}", dim) } }
}

impl EmbedProvider for PseudoProvider {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.inner.dim() }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|t| self.inner.embed(t)).collect()) }
}

/// Provider that is always unavailable, e.g. when no API key is configured.
/// Every call fails so callers take their fallback path.
pub struct OfflineProvider {
    dim: usize,
    id: String,
    reason: String,
}

impl OfflineProvider {
    pub fn new(dim: usize, reason: impl Into<String>) -> Self {
        Self { dim, id: format!("offline:d{}", dim), reason: reason.into() }
    }
}

impl EmbedProvider for OfflineProvider {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> { Err(anyhow!("embedding provider unavailable: {}", self.reason)) }
}

/// Build the provider described by `settings`.
///
/// Respects `APP_USE_FAKE_EMBEDDINGS=1` to switch to the pseudo provider for
/// fast and deterministic outputs in tests and development. An `openai`
/// provider without an API key (settings or `OPENAI_API_KEY`) degrades to an
/// [`OfflineProvider`] instead of failing.
pub fn get_default_provider(settings: &EmbeddingSettings) -> Result<Box<dyn EmbedProvider>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake || settings.provider.eq_ignore_ascii_case("fake") {
        tracing::info!(dim = settings.dimension, "using pseudo embedding provider");
        return Ok(Box::new(PseudoProvider::new(settings.dimension)));
    }
    match settings.provider.to_ascii_lowercase().as_str() {
        "openai" => {
            let api_key = settings.api_key.clone().or_else(|| std::env::var("OPENAI_API_KEY").ok()).filter(|k| !k.trim().is_empty());
            let Some(api_key) = api_key else {
                tracing::warn!("no embeddings API key configured; provider calls will fall back");
                return Ok(Box::new(OfflineProvider::new(settings.dimension, "missing API key")));
            };
            let provider = OpenAiProvider::new(
                api_key,
                settings.base_url.clone(),
                settings.model.clone(),
                settings.dimension,
                Duration::from_secs(settings.timeout_secs),
                settings.max_retries,
            )?;
            Ok(Box::new(provider))
        }
        other => Err(anyhow!("unknown embedding provider '{}'", other)),
    }
}
