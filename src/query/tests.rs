use super::*;
use crate::embedder::HashEmbedder;
use crate::store::{ChunkMetadata, IndexEntry, LocalStore, RemoteStore};
use tempfile::TempDir;

fn populated_store(dir: &TempDir) -> LocalStore {
    let mut store = LocalStore::open(
        dir.path().join("vectors.json"),
        dir.path().join("metadata.json"),
    )
    .expect("open store");

    let embedder = HashEmbedder::new();
    let passages = [
        ("lease.txt", 0, "The tenant shall pay rent on the first day of every month without demand."),
        ("lease.txt", 1, "Either party may terminate this agreement with thirty days written notice."),
        ("nda.txt", 0, "The receiving party shall keep all disclosed information strictly confidential."),
    ];

    let entries: Vec<IndexEntry> = passages
        .iter()
        .map(|&(source, chunk_index, text)| IndexEntry {
            id: format!("{}_{}", source, chunk_index),
            vector: embedder.embed_one(text).expect("embed"),
            metadata: ChunkMetadata {
                text: text.to_string(),
                source: source.to_string(),
                chunk_index,
            },
        })
        .collect();

    store.upsert(&entries).expect("upsert");
    store
}

#[test]
fn returns_relevance_ordered_results() {
    let dir = TempDir::new().expect("tempdir");
    let store = populated_store(&dir);
    let embedder = HashEmbedder::new();

    let results = QueryPipeline::new(&embedder, &store)
        .search("how can this agreement be terminated?", 3)
        .expect("search");

    assert_eq!(results.len(), 3);
    assert!(results[0].text.contains("terminate"));
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn respects_top_k() {
    let dir = TempDir::new().expect("tempdir");
    let store = populated_store(&dir);
    let embedder = HashEmbedder::new();

    let results = QueryPipeline::new(&embedder, &store)
        .search("rent", 1)
        .expect("search");

    assert_eq!(results.len(), 1);
}

#[test]
fn empty_store_returns_no_results() {
    let dir = TempDir::new().expect("tempdir");
    let store = LocalStore::open(
        dir.path().join("vectors.json"),
        dir.path().join("metadata.json"),
    )
    .expect("open store");
    let embedder = HashEmbedder::new();

    let results = QueryPipeline::new(&embedder, &store)
        .search("anything at all", 5)
        .expect("search");

    assert!(results.is_empty());
}

#[test]
fn unusable_store_degrades_to_empty_results() {
    let store = RemoteStore::without_credentials();
    let embedder = HashEmbedder::new();

    let results = QueryPipeline::new(&embedder, &store)
        .search("anything", 5)
        .expect("search");

    assert!(results.is_empty());
}

#[test]
fn blank_question_returns_no_results() {
    let dir = TempDir::new().expect("tempdir");
    let store = populated_store(&dir);
    let embedder = HashEmbedder::new();

    let results = QueryPipeline::new(&embedder, &store)
        .search("   ", 5)
        .expect("search");

    assert!(results.is_empty());
}
