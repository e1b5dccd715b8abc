use super::*;
use tempfile::TempDir;

fn store_paths(dir: &TempDir) -> (PathBuf, PathBuf) {
    (
        dir.path().join("vectors.json"),
        dir.path().join("metadata.json"),
    )
}

fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
    IndexEntry {
        id: id.to_string(),
        vector,
        metadata: ChunkMetadata {
            text: format!("passage for {}", id),
            source: "lease.txt".to_string(),
            chunk_index: 0,
        },
    }
}

#[test]
fn starts_empty_without_artifacts() {
    let dir = TempDir::new().expect("tempdir");
    let (vectors, metadata) = store_paths(&dir);

    let store = LocalStore::open(vectors, metadata).expect("open");

    assert_eq!(store.stats().expect("stats").total_entry_count, 0);
    assert!(store.query(&[1.0, 0.0], 5).expect("query").is_empty());
}

#[test]
fn upsert_is_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let (vectors, metadata) = store_paths(&dir);
    let mut store = LocalStore::open(vectors, metadata).expect("open");

    let entries = vec![entry("lease.txt_0", vec![1.0, 0.0, 0.0])];
    store.upsert(&entries).expect("first upsert");
    let first_results = store.query(&[1.0, 0.0, 0.0], 5).expect("query");

    store.upsert(&entries).expect("second upsert");
    let second_results = store.query(&[1.0, 0.0, 0.0], 5).expect("query");

    assert_eq!(store.stats().expect("stats").total_entry_count, 1);
    assert_eq!(first_results, second_results);
}

#[test]
fn upsert_replaces_existing_entry() {
    let dir = TempDir::new().expect("tempdir");
    let (vectors, metadata) = store_paths(&dir);
    let mut store = LocalStore::open(vectors, metadata).expect("open");

    store
        .upsert(&[entry("lease.txt_0", vec![1.0, 0.0])])
        .expect("upsert");

    let mut replacement = entry("lease.txt_0", vec![0.0, 1.0]);
    replacement.metadata.text = "revised passage".to_string();
    store.upsert(&[replacement]).expect("upsert replacement");

    assert_eq!(store.stats().expect("stats").total_entry_count, 1);
    let results = store.query(&[0.0, 1.0], 1).expect("query");
    assert_eq!(results[0].text, "revised passage");
}

#[test]
fn query_orders_by_descending_score() {
    let dir = TempDir::new().expect("tempdir");
    let (vectors, metadata) = store_paths(&dir);
    let mut store = LocalStore::open(vectors, metadata).expect("open");

    store
        .upsert(&[
            entry("far", vec![10.0, 10.0]),
            entry("near", vec![1.0, 1.0]),
            entry("middle", vec![3.0, 3.0]),
        ])
        .expect("upsert");

    let results = store.query(&[1.0, 1.0], 3).expect("query");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].text, "passage for near");
    assert!(results[0].score >= results[1].score);
    assert!(results[1].score >= results[2].score);
}

#[test]
fn query_caps_results_at_stored_count() {
    let dir = TempDir::new().expect("tempdir");
    let (vectors, metadata) = store_paths(&dir);
    let mut store = LocalStore::open(vectors, metadata).expect("open");

    store
        .upsert(&[entry("only", vec![0.5, 0.5])])
        .expect("upsert");

    let results = store.query(&[0.5, 0.5], 10).expect("query");
    assert_eq!(results.len(), 1);
}

#[test]
fn round_trip_persistence() {
    let dir = TempDir::new().expect("tempdir");
    let (vectors, metadata) = store_paths(&dir);

    let mut store = LocalStore::open(vectors.clone(), metadata.clone()).expect("open");
    store
        .upsert(&[
            entry("lease.txt_0", vec![1.0, 2.0, 3.0]),
            entry("nda.txt_0", vec![4.0, 5.0, 6.0]),
        ])
        .expect("upsert");
    let original = store.query(&[1.0, 2.0, 3.5], 2).expect("query");

    let reopened = LocalStore::open(vectors, metadata).expect("reopen");
    let restored = reopened.query(&[1.0, 2.0, 3.5], 2).expect("query");

    assert_eq!(reopened.stats().expect("stats").total_entry_count, 2);
    assert_eq!(original, restored);
}

#[test]
fn single_artifact_means_empty_index() {
    let dir = TempDir::new().expect("tempdir");
    let (vectors, metadata) = store_paths(&dir);

    let mut store = LocalStore::open(vectors.clone(), metadata.clone()).expect("open");
    store
        .upsert(&[entry("lease.txt_0", vec![1.0, 0.0])])
        .expect("upsert");

    std::fs::remove_file(&metadata).expect("remove metadata artifact");

    let reopened = LocalStore::open(vectors, metadata).expect("reopen");
    assert_eq!(reopened.stats().expect("stats").total_entry_count, 0);
}

#[test]
fn mismatched_artifacts_are_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let (vectors, metadata) = store_paths(&dir);

    let mut store = LocalStore::open(vectors.clone(), metadata.clone()).expect("open");
    store
        .upsert(&[
            entry("lease.txt_0", vec![1.0, 0.0]),
            entry("lease.txt_1", vec![0.0, 1.0]),
        ])
        .expect("upsert");

    std::fs::write(&vectors, b"[[1.0, 0.0]]").expect("truncate vectors artifact");

    assert!(LocalStore::open(vectors, metadata).is_err());
}

#[test]
fn rejects_mixed_dimensions() {
    let dir = TempDir::new().expect("tempdir");
    let (vectors, metadata) = store_paths(&dir);
    let mut store = LocalStore::open(vectors, metadata).expect("open");

    store
        .upsert(&[entry("lease.txt_0", vec![1.0, 0.0])])
        .expect("upsert");

    let result = store.upsert(&[entry("lease.txt_1", vec![1.0, 0.0, 0.0])]);
    assert!(result.is_err());
}
