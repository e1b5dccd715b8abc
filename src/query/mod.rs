#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use tracing::debug;

use crate::embedder::Embedder;
use crate::store::{SearchResult, VectorStore};

/// Embeds a question and returns the store's ranked passages unmodified.
///
/// No caching and no re-ranking: identical repeated questions re-embed and
/// re-query every time, and the store's relevance order is final.
pub struct QueryPipeline<'a> {
    embedder: &'a dyn Embedder,
    store: &'a dyn VectorStore,
}

impl<'a> QueryPipeline<'a> {
    pub fn new(embedder: &'a dyn Embedder, store: &'a dyn VectorStore) -> Self {
        Self { embedder, store }
    }

    /// Return up to `top_k` source-attributed passages for a question.
    ///
    /// An unusable store or a blank question yields an empty result rather
    /// than an error, so callers can answer "no relevant context found"
    /// instead of crashing.
    pub fn search(&self, question: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if !self.store.is_usable() {
            debug!("Vector store is unusable; returning no results");
            return Ok(Vec::new());
        }

        if question.trim().is_empty() {
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed_one(question)
            .context("Failed to embed question")?;

        let results = self
            .store
            .query(&vector, top_k)
            .context("Vector store query failed")?;

        debug!("Query returned {} results", results.len());
        Ok(results)
    }
}
