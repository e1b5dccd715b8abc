use clap::{Parser, Subcommand};
use legal_rag::commands::{
    init_config, run_ask, run_ingest, run_status, show_config, show_document,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "legal-rag")]
#[command(about = "Retrieval engine for question answering over legal contracts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest contract documents into the vector store
    Ingest {
        /// Folder of *.txt documents (defaults to the configured folder)
        folder: Option<PathBuf>,
        /// Re-ingest even if the store is already populated
        #[arg(long)]
        force: bool,
    },
    /// Ask a question and print the most relevant passages
    Ask {
        /// Natural-language question about the contracts
        question: String,
        /// Number of passages to return
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Show engine, store, and embedder status
    Status,
    /// Print a raw document from the documents folder
    Show {
        /// Document file name (no paths)
        file: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                init_config()?;
            }
        }
        Commands::Ingest { folder, force } => {
            run_ingest(folder, force)?;
        }
        Commands::Ask { question, top_k } => {
            run_ask(&question, top_k)?;
        }
        Commands::Status => {
            run_status()?;
        }
        Commands::Show { file } => {
            show_document(&file)?;
        }
    }

    Ok(())
}
