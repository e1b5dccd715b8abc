#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::chunker::ChunkerConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ollama: OllamaConfig,
    pub chunking: ChunkerConfig,
    pub store: StoreConfig,
    pub ingestion: IngestionConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            chunking: ChunkerConfig::default(),
            store: StoreConfig::default(),
            ingestion: IngestionConfig::default(),
            base_dir: PathBuf::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub embedding_dimension: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "nomic-embed-text:latest".to_string(),
            embedding_dimension: 768,
        }
    }
}

/// Which similarity-search backend the engine talks to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub local: LocalStoreConfig,
    pub remote: RemoteStoreConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Local,
            local: LocalStoreConfig::default(),
            remote: RemoteStoreConfig::default(),
        }
    }
}

/// On-disk artifact locations for the local flat index, resolved against
/// `base_dir` unless absolute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LocalStoreConfig {
    pub vectors_file: PathBuf,
    pub metadata_file: PathBuf,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            vectors_file: PathBuf::from("index/vectors.json"),
            metadata_file: PathBuf::from("index/metadata.json"),
        }
    }
}

/// Addressing for the managed remote index. The access credential itself
/// is supplied out-of-band through the named environment variable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteStoreConfig {
    pub index_host: String,
    pub api_key_env: String,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            index_host: "https://legal-contracts.svc.pinecone.io".to_string(),
            api_key_env: "PINECONE_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestionConfig {
    /// Folder scanned for `*.txt` documents
    pub documents_dir: PathBuf,
    /// Chunks per embed-and-upsert batch
    pub batch_size: usize,
    /// Courtesy throttle between batches
    pub pacing_delay_ms: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("documents"),
            batch_size: 50,
            pacing_delay_ms: 500,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be nonzero)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 16 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid ingestion batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(usize),
    #[error("Invalid pacing delay: {0}ms (must be at most 60000)")]
    InvalidPacingDelay(u64),
    #[error("Invalid chunk sizes: overlap {0} must be smaller than max chunk size {1}")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid minimum chunk length: {0} (must be nonzero)")]
    InvalidMinChunkLen(usize),
    #[error("Invalid remote index host: {0}")]
    InvalidIndexHost(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load `config.toml` from the given directory. A missing file yields
    /// the defaults; a present but invalid file is an error.
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.base_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;

        if self.chunking.min_chunk_len == 0 {
            return Err(ConfigError::InvalidMinChunkLen(self.chunking.min_chunk_len));
        }
        if self.chunking.overlap_size >= self.chunking.max_chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                self.chunking.overlap_size,
                self.chunking.max_chunk_size,
            ));
        }

        if self.ingestion.batch_size == 0 || self.ingestion.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.ingestion.batch_size));
        }
        if self.ingestion.pacing_delay_ms > 60_000 {
            return Err(ConfigError::InvalidPacingDelay(self.ingestion.pacing_delay_ms));
        }

        if self.store.backend == StoreBackend::Remote {
            Url::parse(&self.store.remote.index_host).map_err(|_| {
                ConfigError::InvalidIndexHost(self.store.remote.index_host.clone())
            })?;
        }

        Ok(())
    }

    /// Resolve a configured path against the base directory
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn local_vectors_path(&self) -> PathBuf {
        self.resolve(&self.store.local.vectors_file)
    }

    pub fn local_metadata_path(&self) -> PathBuf {
        self.resolve(&self.store.local.metadata_file)
    }

    pub fn documents_path(&self) -> PathBuf {
        self.resolve(&self.ingestion.documents_dir)
    }

    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(16..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        self.ollama_url().map(|_| ())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

/// Default per-user configuration directory for the CLI
pub fn get_config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine user config directory")?;
    Ok(base.join("legal-rag"))
}
