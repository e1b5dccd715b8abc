
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::embedder::{Embedder, OllamaEmbedder};
use crate::ingest::{IngestReport, IngestionPipeline};
use crate::query::QueryPipeline;
use crate::store::{SearchResult, StoreStats, VectorStore, open_store};

/// Handle over the retrieval engine: one embedder, one vector store, and
/// the two pipelines that connect them.
///
/// Constructed once and passed by reference to callers; there is no
/// process-wide singleton. A missing embedding model fails construction
/// outright, while a store without credentials degrades to `is_ready() ==
/// false` and empty search results.
pub struct RagEngine {
    embedder: Box<dyn Embedder>,
    store: Box<dyn VectorStore>,
    config: Config,
}

impl RagEngine {
    pub fn new(config: Config) -> Result<Self> {
        let embedder =
            OllamaEmbedder::new(&config.ollama).context("Failed to build embedder")?;
        embedder
            .health_check()
            .context("Embedding model unavailable")?;

        let store = open_store(&config).context("Failed to open vector store")?;

        info!("Retrieval engine initialized");
        Ok(Self {
            embedder: Box::new(embedder),
            store,
            config,
        })
    }

    /// Assemble an engine from pre-built parts, for callers that construct
    /// the embedder and store themselves
    pub fn from_parts(
        embedder: Box<dyn Embedder>,
        store: Box<dyn VectorStore>,
        config: Config,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Whether the vector store can serve queries
    pub fn is_ready(&self) -> bool {
        self.store.is_usable()
    }

    pub fn stats(&self) -> crate::Result<StoreStats> {
        self.store.stats()
    }

    /// Run ingestion over the configured (or given) documents folder
    pub fn ingest(&mut self, folder: Option<&Path>) -> Result<IngestReport> {
        let folder = folder
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.documents_path());

        let mut pipeline = IngestionPipeline::new(
            self.embedder.as_ref(),
            self.store.as_mut(),
            self.config.chunking.clone(),
            self.config.ingestion.batch_size,
            Duration::from_millis(self.config.ingestion.pacing_delay_ms),
        );
        pipeline.ingest(&folder)
    }

    /// Ingest only when the store reports zero entries.
    ///
    /// This is an approximate guard: it does not detect a partially changed
    /// corpus. A full re-ingest requires the explicit `ingest` call and
    /// relies on idempotent upserts.
    pub fn ingest_if_needed(&mut self, folder: Option<&Path>) -> Result<Option<IngestReport>> {
        let stats = self.store.stats().context("Failed to read store stats")?;
        if stats.total_entry_count > 0 {
            info!(
                "Store already holds {} entries; skipping ingestion",
                stats.total_entry_count
            );
            return Ok(None);
        }

        self.ingest(folder).map(Some)
    }

    /// Return up to `top_k` ranked, source-attributed passages for a
    /// question. Empty when the store is unusable or unpopulated.
    pub fn search(&self, question: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        QueryPipeline::new(self.embedder.as_ref(), self.store.as_ref()).search(question, top_k)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
