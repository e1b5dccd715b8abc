#[cfg(test)]
mod tests;

use std::fs;
use std::path::PathBuf;

use serde_json as json;
use tracing::{debug, info};

use super::{ChunkMetadata, IndexEntry, SearchResult, StoreStats, VectorStore};
use crate::{RagError, Result};

/// Flat (exhaustive) similarity index held in process memory, persisted to
/// two on-disk artifacts: the raw vectors and the parallel metadata list.
///
/// Queries are exact nearest-neighbor scans by squared Euclidean distance;
/// there is no index structure beyond the flat scan.
pub struct LocalStore {
    vectors_path: PathBuf,
    metadata_path: PathBuf,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    metadata: Vec<ChunkMetadata>,
}

impl LocalStore {
    /// Open a local store, loading the persisted artifacts if both exist.
    ///
    /// Absence of either artifact means an empty index, not an error. A
    /// length mismatch between the two artifacts is corruption and fails.
    pub fn open(vectors_path: PathBuf, metadata_path: PathBuf) -> Result<Self> {
        let mut store = Self {
            vectors_path,
            metadata_path,
            ids: Vec::new(),
            vectors: Vec::new(),
            metadata: Vec::new(),
        };
        store.load()?;
        Ok(store)
    }

    fn load(&mut self) -> Result<()> {
        if !self.vectors_path.exists() || !self.metadata_path.exists() {
            debug!(
                "No persisted index at {:?} / {:?}, starting empty",
                self.vectors_path, self.metadata_path
            );
            return Ok(());
        }

        let vectors_raw = fs::read(&self.vectors_path)?;
        let vectors: Vec<Vec<f32>> = json::from_slice(&vectors_raw)
            .map_err(|e| RagError::Store(format!("Failed to parse vectors artifact: {}", e)))?;

        let metadata_raw = fs::read(&self.metadata_path)?;
        let records: Vec<StoredRecord> = json::from_slice(&metadata_raw)
            .map_err(|e| RagError::Store(format!("Failed to parse metadata artifact: {}", e)))?;

        if vectors.len() != records.len() {
            return Err(RagError::Store(format!(
                "Index artifacts disagree: {} vectors vs {} metadata records",
                vectors.len(),
                records.len()
            )));
        }

        self.vectors = vectors;
        (self.ids, self.metadata) = records.into_iter().map(|r| (r.id, r.metadata)).unzip();

        info!("Loaded local index with {} entries", self.vectors.len());
        Ok(())
    }

    /// Persist both artifacts. Called after every successful upsert so a
    /// fresh store opened from disk matches the in-memory state.
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.vectors_path.parent() {
            fs::create_dir_all(parent)?;
        }
        if let Some(parent) = self.metadata_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let vectors = json::to_vec(&self.vectors)
            .map_err(|e| RagError::Store(format!("Failed to serialize vectors: {}", e)))?;
        fs::write(&self.vectors_path, vectors)?;

        let records: Vec<StoredRecord> = self
            .ids
            .iter()
            .zip(self.metadata.iter())
            .map(|(id, metadata)| StoredRecord {
                id: id.clone(),
                metadata: metadata.clone(),
            })
            .collect();
        let metadata = json::to_vec(&records)
            .map_err(|e| RagError::Store(format!("Failed to serialize metadata: {}", e)))?;
        fs::write(&self.metadata_path, metadata)?;

        Ok(())
    }

    fn dimension(&self) -> Option<usize> {
        self.vectors.first().map(Vec::len)
    }
}

/// On-disk shape of one metadata record, parallel to the vectors list
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StoredRecord {
    id: String,
    metadata: ChunkMetadata,
}

impl VectorStore for LocalStore {
    fn upsert(&mut self, entries: &[IndexEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        for entry in entries {
            if self
                .dimension()
                .is_some_and(|dimension| entry.vector.len() != dimension)
            {
                return Err(RagError::Store(format!(
                    "Vector dimension mismatch: store holds {:?}, entry '{}' has {}",
                    self.dimension(),
                    entry.id,
                    entry.vector.len()
                )));
            }

            match self.ids.iter().position(|id| id == &entry.id) {
                Some(position) => {
                    self.vectors[position] = entry.vector.clone();
                    self.metadata[position] = entry.metadata.clone();
                }
                None => {
                    self.ids.push(entry.id.clone());
                    self.vectors.push(entry.vector.clone());
                    self.metadata.push(entry.metadata.clone());
                }
            }
        }

        self.persist()?;
        debug!(
            "Upserted {} entries, index now holds {}",
            entries.len(),
            self.vectors.len()
        );
        Ok(())
    }

    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        if self.vectors.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        if self
            .dimension()
            .is_some_and(|dimension| vector.len() != dimension)
        {
            return Err(RagError::Store(format!(
                "Query vector dimension {} does not match index dimension {:?}",
                vector.len(),
                self.dimension()
            )));
        }

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, stored)| (squared_distance(vector, stored), position))
            .collect();

        // Raw distance is smaller-is-better; sort ascending before the
        // score conversion flips the polarity.
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(distance, position)| {
                let metadata = &self.metadata[position];
                SearchResult {
                    text: metadata.text.clone(),
                    source: metadata.source.clone(),
                    score: 1.0 / (1.0 + distance),
                }
            })
            .collect())
    }

    fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            total_entry_count: self.vectors.len() as u64,
        })
    }
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
