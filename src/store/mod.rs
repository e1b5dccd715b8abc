pub mod local;
pub mod remote;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::config::{Config, StoreBackend};

pub use local::LocalStore;
pub use remote::RemoteStore;

/// Metadata stored alongside each vector, returned with search hits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub text: String,
    pub source: String,
    pub chunk_index: u32,
}

/// The unit of storage in a vector store.
///
/// Upserting an entry whose `id` already exists replaces the prior entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A ranked, source-attributed passage returned for a query.
///
/// Higher `score` means more relevant for every backend; the local flat
/// index converts its raw distance before exposure.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// Entry count summary, used to decide whether ingestion is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub total_entry_count: u64,
}

/// Abstraction over a similarity-search backend.
///
/// A handle must be safe for concurrent read (query) access when shared;
/// concurrent ingestion runs against the same store require external
/// coordination and resolve as last-write-wins at the backend's discretion.
pub trait VectorStore: Send + Sync {
    /// Insert-or-replace entries by id. Idempotent: repeating a call with
    /// the same entries leaves the store in the same observable state.
    fn upsert(&mut self, entries: &[IndexEntry]) -> Result<()>;

    /// Return up to `top_k` results ordered by descending relevance.
    /// Empty if the store has no entries or is unusable.
    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    fn stats(&self) -> Result<StoreStats>;

    /// Whether the store can serve queries at all. A store constructed
    /// without its required credentials reports `false` instead of failing
    /// every call.
    fn is_usable(&self) -> bool {
        true
    }
}

/// Open the vector store backend selected by configuration
pub fn open_store(config: &Config) -> Result<Box<dyn VectorStore>> {
    match config.store.backend {
        StoreBackend::Local => {
            let store = LocalStore::open(config.local_vectors_path(), config.local_metadata_path())?;
            Ok(Box::new(store))
        }
        StoreBackend::Remote => Ok(Box::new(RemoteStore::new(&config.store.remote))),
    }
}
