//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/postboard.sqlite"
//!
//! [embedding]
//! provider = "voyage"    # voyage | hash | disabled
//! model = "voyage-3"
//! dims = 1024
//!
//! [retrieval]
//! search_limit = 10
//! similar_limit = 5
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{Context, Result};
use postboard_core::embedding::DEFAULT_DIMS;
use postboard_core::posts::PostLimits;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Upper bound on results per vector search.
pub const MAX_VECTOR_RESULTS: usize = 256;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Base URL of the provider API; defaults to the public Voyage endpoint.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: default_dims(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_dims() -> usize {
    DEFAULT_DIMS
}
fn default_max_retries() -> u32 {
    0
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_similar_limit")]
    pub similar_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
            similar_limit: default_similar_limit(),
        }
    }
}

fn default_search_limit() -> usize {
    10
}
fn default_similar_limit() -> usize {
    5
}

impl RetrievalConfig {
    pub fn limits(&self) -> PostLimits {
        PostLimits {
            search_limit: self.search_limit,
            similar_limit: self.similar_limit,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Defaults with the database at `db_path` and the offline hash embedder.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            embedding: EmbeddingConfig {
                provider: "hash".to_string(),
                ..EmbeddingConfig::default()
            },
            retrieval: RetrievalConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Retrieval
    if !(1..=MAX_VECTOR_RESULTS).contains(&config.retrieval.search_limit) {
        anyhow::bail!(
            "retrieval.search_limit must be in [1, {}]",
            MAX_VECTOR_RESULTS
        );
    }
    // similar-by-id asks the store for one extra neighbor
    if !(1..MAX_VECTOR_RESULTS).contains(&config.retrieval.similar_limit) {
        anyhow::bail!(
            "retrieval.similar_limit must be in [1, {}]",
            MAX_VECTOR_RESULTS - 1
        );
    }

    // Embedding
    match config.embedding.provider.as_str() {
        "disabled" | "hash" => {}
        "voyage" => {
            if config.embedding.model.is_none() {
                anyhow::bail!("embedding.model must be specified when provider is 'voyage'");
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, voyage, or hash.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.dims == 0 {
        anyhow::bail!(
            "embedding.dims must be > 0 when provider is '{}'",
            config.embedding.provider
        );
    }

    Ok(())
}
