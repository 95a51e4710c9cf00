use anirec::Result;
use anirec::commands::{build_index, serve_web, show_status};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "anirec")]
#[command(about = "An anime recommendation service backed by a local vector index")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build (or rebuild) the vector index from the source CSVs
    Build {
        /// Path to the synopsis CSV (overrides config)
        #[arg(long)]
        synopsis: Option<PathBuf>,
        /// Path to the metadata CSV (overrides config)
        #[arg(long)]
        metadata: Option<PathBuf>,
    },
    /// Start the recommendation web server
    Serve {
        /// Host to bind (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Show the status of Ollama, Groq credentials and the index
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { synopsis, metadata } => {
            build_index(synopsis, metadata).await?;
        }
        Commands::Serve { host, port } => {
            serve_web(host, port).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
