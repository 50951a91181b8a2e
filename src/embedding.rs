//! Embedding provider implementations.
//!
//! - **[`DisabledEmbedder`]**: fails every call; used when no provider is configured.
//! - **[`VoyageEmbedder`]**: calls the Voyage AI embeddings API.
//! - **[`HashEmbedder`]**: deterministic offline embedder from the core crate,
//!   selected with `provider = "hash"`.
//!
//! Use [`create_embedder`] to build the provider named in the config.
//!
//! # Retry Strategy
//!
//! The Voyage provider retries transient failures up to
//! `embedding.max_retries` times (default 0, a single attempt):
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use postboard_core::embedding::{Embedder, HashEmbedder};
use postboard_core::PostError;

use crate::config::EmbeddingConfig;

/// Public Voyage AI API base URL.
pub const VOYAGE_API_URL: &str = "https://api.voyageai.com";

/// Environment variable holding the Voyage API key.
pub const VOYAGE_API_KEY_ENV: &str = "VOYAGE_API_KEY";

/// Build the embedder selected by `config.provider`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder::new(config.dims))),
        "hash" => Ok(Arc::new(HashEmbedder::new(config.dims))),
        "voyage" => Ok(Arc::new(VoyageEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

// ============ Disabled Provider ============

/// An embedder that always fails with [`PostError::EmbeddingsDisabled`].
///
/// Read-only operations that reuse stored vectors (listing, detail,
/// similar-by-id) keep working; creating and searching do not.
pub struct DisabledEmbedder {
    dims: usize,
}

impl DisabledEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(PostError::EmbeddingsDisabled.into())
    }
}

// ============ Voyage Provider ============

/// Embedding provider using the Voyage AI API.
///
/// Calls `POST {url}/v1/embeddings` with `input_type = "query"`.
pub struct VoyageEmbedder {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl VoyageEmbedder {
    /// Create a provider from config, reading the key from `VOYAGE_API_KEY`.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(VOYAGE_API_KEY_ENV)
            .with_context(|| format!("{} environment variable not set", VOYAGE_API_KEY_ENV))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Voyage provider"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| VOYAGE_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model,
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for VoyageEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request_embedding(text)
            .await
            .map_err(|e| PostError::Provider(format!("{:#}", e)).into())
    }
}

impl VoyageEmbedder {
    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "input": [text],
            "model": self.model,
            "input_type": "query",
        });
        let endpoint = format!("{}/v1/embeddings", self.url);

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                warn!(attempt, ?delay, "retrying Voyage embedding request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_voyage_response(&json)?
                            .into_iter()
                            .next()
                            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"));
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow::anyhow!(
                            "Voyage API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    bail!("Voyage API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(anyhow::Error::new(e).context("Voyage API request failed"));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
    }
}

/// Parse a Voyage embeddings response.
///
/// Returns the `data[].embedding` arrays ordered by `data[].index`.
pub fn parse_voyage_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Voyage response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());

    for (pos, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid Voyage response: missing embedding"))?;

        let vec = embedding
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| anyhow::anyhow!("Invalid Voyage response: non-numeric value"))
            })
            .collect::<Result<Vec<f32>>>()?;

        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .unwrap_or(pos as u64);
        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}
