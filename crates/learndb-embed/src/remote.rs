//! OpenAI-compatible embeddings provider.
//!
//! Uses the blocking reqwest client, so construct it outside of an async
//! runtime and call it from a blocking context (`spawn_blocking`).

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use learndb_core::traits::EmbedProvider;

pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    /// Sent as `dimensions` only for models that accept the override.
    request_dimensions: Option<usize>,
    max_retries: usize,
    id: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        dimensions: usize,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing embeddings API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing embeddings model name");
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&auth).context("invalid embeddings API key")?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build embeddings HTTP client")?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        let id = format!("openai:{}:d{}", model, dimensions);
        let request_dimensions = supports_dimensions(&model).then_some(dimensions);
        Ok(Self { client, endpoint, model, dimensions, request_dimensions, max_retries, id })
    }

    fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0usize;
        loop {
            let request = EmbeddingRequest { model: &self.model, input: inputs, dimensions: self.request_dimensions };
            match self.client.post(&self.endpoint).json(&request).send() {
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
                    if status.is_success() {
                        let mut parsed: EmbeddingResponse =
                            serde_json::from_str(&body).context("failed to parse embeddings response")?;
                        // The API may return entries out of order; `index` is authoritative.
                        parsed.data.sort_by_key(|entry| entry.index);
                        return Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect());
                    }
                    if should_retry(status) && attempt < self.max_retries {
                        attempt += 1;
                        tracing::debug!(%status, attempt, "retrying embeddings request");
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    anyhow::bail!("embeddings request failed ({}): {}", status, body);
                }
                Err(err) => {
                    if (err.is_timeout() || err.is_connect()) && attempt < self.max_retries {
                        attempt += 1;
                        tracing::debug!(error = %err, attempt, "retrying embeddings request");
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }
}

impl EmbedProvider for OpenAiProvider {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dimensions }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        self.request(texts)
    }
}

/// Only the `text-embedding-3` family accepts a `dimensions` override;
/// older models such as `text-embedding-ada-002` reject it.
pub fn supports_dimensions(model: &str) -> bool { model.starts_with("text-embedding-3") }

/// Worst-case wall time of one `embed_batch`: every attempt running into the
/// request timeout, plus the backoff slept between attempts.
pub fn retry_budget(request_timeout: Duration, max_retries: usize) -> Duration {
    let attempts = u32::try_from(max_retries.saturating_add(1)).unwrap_or(u32::MAX);
    (1..=max_retries).map(retry_backoff).fold(request_timeout.saturating_mul(attempts), Duration::saturating_add)
}

fn should_retry(status: StatusCode) -> bool { status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() }

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(4) as u32;
    Duration::from_millis(250 * (1 << capped))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
