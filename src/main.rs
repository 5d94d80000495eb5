use std::path::PathBuf;

use catalog_rag::Result;
use catalog_rag::commands::{ask, configure, ingest_file, init_index, print_config, show_status};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "catalog-rag")]
#[command(about = "Retrieval-augmented answering over a product catalog")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure model providers and the index
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Create the vector index with the configured schema
    Init,
    /// Ingest a change notification from a JSON file of content records
    Ingest {
        /// Path to a JSON array of content records
        file: PathBuf,
    },
    /// Ask a question grounded in the indexed catalog
    Ask {
        /// The question to answer
        question: String,
    },
    /// Show index and queue status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                print_config()?;
            } else {
                configure()?;
            }
        }
        Commands::Init => {
            init_index().await?;
        }
        Commands::Ingest { file } => {
            ingest_file(&file).await?;
        }
        Commands::Ask { question } => {
            ask(&question).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
