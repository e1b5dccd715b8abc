
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::chunker::{Chunk, ChunkerConfig, chunk_document};
use crate::embedder::Embedder;
use crate::store::{ChunkMetadata, IndexEntry, VectorStore};
use crate::{RagError, Result as RagResult};

/// Outcome of one ingestion run.
///
/// Batch failures are recorded here instead of being swallowed; a run with
/// failed batches still completes and the report says exactly what is
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks_total: usize,
    pub chunks_ingested: usize,
    pub failed_batches: Vec<BatchFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub reason: String,
}

/// Orchestrates chunking, embedding, and upserting in bounded batches.
///
/// A failed batch is logged and skipped, never aborting the run: callers
/// needing strict completeness re-run ingestion and rely on the store's
/// idempotent upsert to fill gaps. Concurrent ingestion runs against the
/// same store require external coordination.
pub struct IngestionPipeline<'a> {
    embedder: &'a dyn Embedder,
    store: &'a mut dyn VectorStore,
    chunker: ChunkerConfig,
    batch_size: usize,
    pacing_delay: Duration,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        store: &'a mut dyn VectorStore,
        chunker: ChunkerConfig,
        batch_size: usize,
        pacing_delay: Duration,
    ) -> Self {
        Self {
            embedder,
            store,
            chunker,
            batch_size: batch_size.max(1),
            pacing_delay,
        }
    }

    /// Ingest every `*.txt` file directly under `folder`.
    ///
    /// An empty or missing folder is a no-op, not an error.
    pub fn ingest(&mut self, folder: &Path) -> Result<IngestReport> {
        let files = list_documents(folder)?;
        if files.is_empty() {
            info!("No documents found in {:?}", folder);
            return Ok(IngestReport::default());
        }

        info!("Found {} documents in {:?}", files.len(), folder);

        let mut working_set: Vec<Chunk> = Vec::new();
        for file in &files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let bytes = fs::read(file)
                .with_context(|| format!("Failed to read document {:?}", file))?;
            let text = String::from_utf8_lossy(&bytes);

            working_set.extend(chunk_document(&name, &text, &self.chunker));
        }

        let report = self.ingest_chunks(&working_set)?;
        info!(
            "Ingestion complete: {}/{} chunks from {} documents ({} failed batches)",
            report.chunks_ingested,
            report.chunks_total,
            files.len(),
            report.failed_batches.len()
        );

        Ok(IngestReport {
            documents: files.len(),
            ..report
        })
    }

    fn ingest_chunks(&mut self, chunks: &[Chunk]) -> Result<IngestReport> {
        let mut report = IngestReport {
            chunks_total: chunks.len(),
            ..IngestReport::default()
        };

        let batch_count = chunks.len().div_ceil(self.batch_size);
        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            match self.ingest_batch(batch) {
                Ok(()) => {
                    report.chunks_ingested += batch.len();
                    debug!(
                        "Batch {}/{} committed ({} chunks)",
                        batch_index + 1,
                        batch_count,
                        batch.len()
                    );
                }
                Err(e) => {
                    // A single batch failure must not abort the run.
                    warn!("Batch {}/{} failed: {}", batch_index + 1, batch_count, e);
                    report.failed_batches.push(BatchFailure {
                        batch_index,
                        reason: e.to_string(),
                    });
                }
            }

            if batch_index + 1 < batch_count && !self.pacing_delay.is_zero() {
                std::thread::sleep(self.pacing_delay);
            }
        }

        Ok(report)
    }

    fn ingest_batch(&mut self, batch: &[Chunk]) -> Result<()> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed(&texts)
            .context("Failed to embed batch")?;

        let entries: Vec<IndexEntry> = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry {
                id: chunk.chunk_id.clone(),
                vector,
                metadata: ChunkMetadata {
                    text: chunk.text.clone(),
                    source: chunk.source.clone(),
                    chunk_index: chunk.chunk_index as u32,
                },
            })
            .collect();

        self.store.upsert(&entries).context("Failed to upsert batch")?;
        Ok(())
    }
}

/// Enumerate `*.txt` files directly under `folder`, sorted by file name.
/// Non-recursive; no other file types are recognized.
fn list_documents(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(folder)
        .with_context(|| format!("Failed to read document folder {:?}", folder))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Resolve a user-supplied document file name inside the documents folder.
///
/// Rejects absolute paths, parent-directory components, and anything with a
/// path separator so a caller serving raw documents cannot traverse outside
/// the folder.
pub fn resolve_document_path(folder: &Path, file_name: &str) -> RagResult<PathBuf> {
    let candidate = Path::new(file_name);

    let is_plain_file_name = candidate.components().count() == 1
        && !candidate.is_absolute()
        && !file_name.contains("..")
        && !file_name.contains('/')
        && !file_name.contains('\\');

    if !is_plain_file_name {
        return Err(RagError::InvalidPath(file_name.to_string()));
    }

    Ok(folder.join(candidate))
}
