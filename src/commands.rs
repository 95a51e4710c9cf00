use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::embeddings::OllamaClient;
use crate::index::VectorStore;
use crate::llm;
use crate::pipeline::{AppContext, BuildPipeline};
use crate::server;

/// Build (or rebuild) the vector index from the source CSVs
#[inline]
pub async fn build_index(synopsis: Option<PathBuf>, metadata: Option<PathBuf>) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    if let Some(path) = synopsis {
        config.data.synopsis_csv = path;
    }
    if let Some(path) = metadata {
        config.data.metadata_csv = path;
    }

    println!("🔨 Building anime index");
    println!("   Synopsis CSV: {}", config.data.synopsis_csv.display());
    println!("   Metadata CSV: {}", config.data.metadata_csv.display());
    println!("   Index: {}", config.index_path().display());

    info!("Starting index build");

    let report = BuildPipeline::new(config).run().await?;

    println!("Build completed successfully!");
    println!("  Processed rows: {}", report.processed_rows);
    println!("  Indexed documents: {}", report.indexed_documents);
    println!("  Processed CSV: {}", report.output_csv.display());

    Ok(())
}

/// Start the recommendation web server
#[inline]
pub async fn serve_web(host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let context = AppContext::initialize(config)
        .await
        .context("Failed to initialize application context")?;

    println!(
        "🚀 Serving recommendations at http://{}:{} ({} documents indexed)",
        host,
        port,
        context.document_count()
    );
    println!("Press Ctrl+C to stop the server");

    server::serve(Arc::new(context), &host, port).await?;

    Ok(())
}

/// Show the status of every external dependency and the index
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("📊 Anirec Status Report");
    println!("{}", "=".repeat(50));
    println!();

    // Ollama connectivity
    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
                println!("   🔢 Batch Size: {}", config.ollama.batch_size);
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Connected but unhealthy - {}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Failed to connect - {}", e);
        }
    }

    // Groq credentials
    println!("🧠 Groq Status:");
    if llm::has_api_key() {
        println!("   ✅ GROQ_API_KEY: Present");
        println!("   📋 Model: {}", config.groq.model);
    } else {
        println!("   ❌ GROQ_API_KEY: Not set");
        println!("   Export GROQ_API_KEY before running 'anirec serve'");
    }

    // Vector index status
    println!("🔍 Vector Index Status:");
    match VectorStore::open(
        &config.index_path(),
        config.ollama.embedding_dimension as usize,
    )
    .await
    {
        Ok(store) => match store.is_built().await {
            Ok(true) => match store.count_documents().await {
                Ok(count) => {
                    println!("   ✅ LanceDB: Built ({} documents)", count);
                    println!("   📁 Path: {}", config.index_path().display());
                }
                Err(e) => {
                    println!("   ⚠️  LanceDB: Built but unreadable - {}", e);
                }
            },
            Ok(false) => {
                println!("   📭 LanceDB: Not built yet");
                println!("   Use 'anirec build' to create the index");
            }
            Err(e) => {
                println!("   ❌ LanceDB: Failed to inspect - {}", e);
            }
        },
        Err(e) => {
            println!("   ❌ LanceDB: Failed to open - {}", e);
        }
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'anirec build' to (re)build the index from the source CSVs");
    println!("   • Use 'anirec serve' to start the recommendation web server");

    Ok(())
}
