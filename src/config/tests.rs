use super::*;
use crate::chunker::ChunkStrategy;
use tempfile::TempDir;

#[test]
fn missing_file_yields_defaults() {
    let dir = TempDir::new().expect("tempdir");

    let config = Config::load(dir.path()).expect("load");

    assert_eq!(config, Config {
        base_dir: dir.path().to_path_buf(),
        ..Config::default()
    });
    assert_eq!(config.store.backend, StoreBackend::Local);
    assert_eq!(config.ingestion.batch_size, 50);
}

#[test]
fn save_and_reload_round_trip() {
    let dir = TempDir::new().expect("tempdir");

    let mut config = Config {
        base_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    config.ollama.model = "mxbai-embed-large:latest".to_string();
    config.chunking.strategy = ChunkStrategy::Recursive;
    config.ingestion.batch_size = 25;
    config.save().expect("save");

    let reloaded = Config::load(dir.path()).expect("reload");
    assert_eq!(reloaded, config);
}

#[test]
fn parses_partial_config_with_defaults() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("config.toml"),
        r#"
[store]
backend = "remote"

[store.remote]
index_host = "https://contracts-prod.svc.example.io"
"#,
    )
    .expect("write config");

    let config = Config::load(dir.path()).expect("load");

    assert_eq!(config.store.backend, StoreBackend::Remote);
    assert_eq!(
        config.store.remote.index_host,
        "https://contracts-prod.svc.example.io"
    );
    assert_eq!(config.store.remote.api_key_env, "PINECONE_API_KEY");
    assert_eq!(config.ollama.port, 11434);
}

#[test]
fn rejects_invalid_values() {
    let mut config = Config::default();
    config.ollama.protocol = "ftp".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));

    let mut config = Config::default();
    config.ollama.model = "  ".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidModel(_))
    ));

    let mut config = Config::default();
    config.ollama.embedding_dimension = 8;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidEmbeddingDimension(8))
    ));

    let mut config = Config::default();
    config.ingestion.batch_size = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidBatchSize(0))
    ));

    let mut config = Config::default();
    config.chunking.overlap_size = 500;
    config.chunking.max_chunk_size = 500;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OverlapTooLarge(500, 500))
    ));

    let mut config = Config::default();
    config.store.backend = StoreBackend::Remote;
    config.store.remote.index_host = "not a url".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidIndexHost(_))
    ));
}

#[test]
fn invalid_file_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("config.toml"),
        "[ollama]\nport = 0\n",
    )
    .expect("write config");

    assert!(Config::load(dir.path()).is_err());
}

#[test]
fn paths_resolve_against_base_dir() {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::load(dir.path()).expect("load");

    assert_eq!(
        config.local_vectors_path(),
        dir.path().join("index/vectors.json")
    );
    assert_eq!(
        config.local_metadata_path(),
        dir.path().join("index/metadata.json")
    );
    assert_eq!(config.documents_path(), dir.path().join("documents"));
}

#[test]
fn absolute_paths_are_kept() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = Config::load(dir.path()).expect("load");
    config.ingestion.documents_dir = PathBuf::from("/srv/contracts");

    assert_eq!(config.documents_path(), PathBuf::from("/srv/contracts"));
}
