use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::config::{Config, get_config_dir};
use crate::engine::RagEngine;
use crate::ingest::resolve_document_path;

fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    Config::load(&config_dir)
}

/// Ingest the documents folder into the configured vector store.
///
/// Without `force`, a store that already holds entries is left alone.
pub fn run_ingest(folder: Option<PathBuf>, force: bool) -> Result<()> {
    let config = load_config()?;
    let mut engine = RagEngine::new(config).context("Failed to initialize retrieval engine")?;

    let report = if force {
        Some(engine.ingest(folder.as_deref())?)
    } else {
        engine.ingest_if_needed(folder.as_deref())?
    };

    match report {
        Some(report) => {
            println!(
                "Ingested {}/{} chunks from {} documents",
                report.chunks_ingested, report.chunks_total, report.documents
            );
            if !report.failed_batches.is_empty() {
                println!("{} batches failed:", report.failed_batches.len());
                for failure in &report.failed_batches {
                    println!("  batch {}: {}", failure.batch_index, failure.reason);
                }
                println!("Re-run with --force to fill the gaps.");
            }
        }
        None => {
            println!("Store is already populated; skipping ingestion (use --force to re-ingest).");
        }
    }

    Ok(())
}

/// Answer a question by printing the most relevant contract passages
pub fn run_ask(question: &str, top_k: usize) -> Result<()> {
    let config = load_config()?;
    let engine = RagEngine::new(config).context("Failed to initialize retrieval engine")?;

    let results = engine.search(question, top_k)?;

    if results.is_empty() {
        println!("No relevant information found in the indexed contracts.");
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. {} (score {:.3})",
            rank + 1,
            result.source,
            result.score
        );
        println!("   {}", result.text);
        println!();
    }

    Ok(())
}

/// Show store and embedder status
pub fn run_status() -> Result<()> {
    let config = load_config()?;
    println!("Config: {}", config.config_file_path().display());
    println!("Documents folder: {}", config.documents_path().display());

    match RagEngine::new(config) {
        Ok(engine) => {
            println!("Embedding model: available");
            if engine.is_ready() {
                match engine.stats() {
                    Ok(stats) => println!("Vector store: {} entries", stats.total_entry_count),
                    Err(e) => println!("Vector store: unreachable ({})", e),
                }
            } else {
                println!("Vector store: unusable (missing credential)");
            }
        }
        Err(e) => {
            println!("Engine unavailable: {:#}", e);
        }
    }

    Ok(())
}

/// Print the effective configuration
pub fn show_config() -> Result<()> {
    let config = load_config()?;
    let rendered =
        toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("# {}", config.config_file_path().display());
    print!("{}", rendered);
    Ok(())
}

/// Write a default config file if none exists yet
pub fn init_config() -> Result<()> {
    let config_dir = get_config_dir()?;
    let config = Config::load(&config_dir)?;
    let path = config.config_file_path();

    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    config.save()?;
    info!("Wrote default config to {}", path.display());
    println!("Wrote default config to {}", path.display());
    Ok(())
}

/// Print a raw document from the documents folder.
///
/// The file name is validated against path traversal before any read.
pub fn show_document(file_name: &str) -> Result<()> {
    let config = load_config()?;
    let path = resolve_document_path(&config.documents_path(), file_name)?;

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read document {}", path.display()))?;
    print!("{}", content);
    Ok(())
}
