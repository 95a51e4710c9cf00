// Pipeline module
// Offline index build and shared serve-time context


use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::AnirecError;
use crate::config::Config;
use crate::data;
use crate::embeddings::OllamaClient;
use crate::index::{Document, DocumentEmbedding, VectorStore};
use crate::llm::{self, GroqClient};
use crate::recommender::{Recommender, RecommenderOptions};

/// Summary of one offline build run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub processed_rows: usize,
    pub indexed_documents: usize,
    pub output_csv: PathBuf,
}

/// Offline build: merge the source CSVs, embed every document and replace
/// the vector index wholesale.
pub struct BuildPipeline {
    config: Config,
}

impl BuildPipeline {
    #[inline]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the full build.
    ///
    /// Every embedding is generated before the old index is touched, so a
    /// mid-run failure (Ollama down, bad batch) leaves the previous index
    /// intact and searchable.
    #[inline]
    pub async fn run(&self) -> Result<BuildReport, AnirecError> {
        let output_csv = data::load_and_process(
            &self.config.data.synopsis_csv,
            &self.config.data.metadata_csv,
            &self.config.data.processed_csv,
        )?;

        let records = data::read_processed(&output_csv)?;
        let documents: Vec<Document> = records.iter().map(Document::from_record).collect();
        info!("Prepared {} documents for embedding", documents.len());

        let embedder = OllamaClient::new(&self.config.ollama)
            .map_err(|e| AnirecError::Embedding(format!("{}", e)))?;
        embedder
            .health_check()
            .map_err(|e| AnirecError::Embedding(format!("Ollama is not reachable: {}", e)))?;

        let embeddings = self.embed_documents(&embedder, &documents)?;

        let dimension = embeddings[0].vector.len();
        if dimension != self.config.ollama.embedding_dimension as usize {
            warn!(
                "Model returned {}-dimensional vectors, config says {}",
                dimension, self.config.ollama.embedding_dimension
            );
        }

        let store = VectorStore::open(&self.config.index_path(), dimension).await?;
        store.rebuild(&embeddings).await?;

        Ok(BuildReport {
            processed_rows: records.len(),
            indexed_documents: embeddings.len(),
            output_csv,
        })
    }

    /// Embed all documents in configured batches, collecting every vector
    /// before returning. Fails as a whole if any batch fails.
    fn embed_documents(
        &self,
        embedder: &OllamaClient,
        documents: &[Document],
    ) -> Result<Vec<DocumentEmbedding>, AnirecError> {
        if documents.is_empty() {
            return Err(AnirecError::Data(
                "No documents to embed; the processed dataset is empty".to_string(),
            ));
        }

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(documents.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding documents")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let batch_size = self.config.ollama.batch_size as usize;
        let mut embeddings = Vec::with_capacity(documents.len());

        for chunk in documents.chunks(batch_size) {
            let texts: Vec<String> = chunk.iter().map(|doc| doc.content.clone()).collect();

            let vectors = embedder
                .embed_batch(&texts)
                .map_err(|e| AnirecError::Embedding(format!("Batch embedding failed: {}", e)))?;

            for (document, vector) in chunk.iter().cloned().zip(vectors) {
                embeddings.push(DocumentEmbedding { document, vector });
            }
            bar.set_position(embeddings.len() as u64);
        }

        bar.finish_and_clear();
        info!("Embedded {} documents", embeddings.len());
        Ok(embeddings)
    }
}

/// Everything the serving layer needs, wired up once at startup.
///
/// Construction fails loudly when a prerequisite is missing (no index, no
/// API key) instead of deferring the error to the first request.
pub struct AppContext {
    config: Config,
    recommender: Recommender,
    document_count: u64,
}

impl std::fmt::Debug for AppContext {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("document_count", &self.document_count)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Wire up the serve-time dependencies from configuration
    #[inline]
    pub async fn initialize(config: Config) -> Result<Self, AnirecError> {
        let store = VectorStore::open(
            &config.index_path(),
            config.ollama.embedding_dimension as usize,
        )
        .await?;

        if !store.is_built().await? {
            return Err(AnirecError::Index(
                "Vector index has not been built. Run 'anirec build' first.".to_string(),
            ));
        }

        let document_count = store.count_documents().await?;
        if document_count == 0 {
            return Err(AnirecError::Index(
                "Vector index is empty. Run 'anirec build' first.".to_string(),
            ));
        }

        let embedder = OllamaClient::new(&config.ollama)
            .map_err(|e| AnirecError::Embedding(format!("{}", e)))?;

        let api_key = llm::api_key_from_env()?;
        let llm_client = GroqClient::new(&config.groq, api_key)
            .map_err(|e| AnirecError::Upstream(format!("{}", e)))?;

        let options = RecommenderOptions {
            top_k: config.retrieval.top_k,
            temperature: config.groq.temperature,
            max_context_chars: config.retrieval.max_context_chars,
        };
        let recommender = Recommender::new(store, embedder, llm_client, options)?;

        info!(
            "Application context ready ({} documents indexed)",
            document_count
        );

        Ok(Self {
            config,
            recommender,
            document_count,
        })
    }

    /// Assemble a context from already-constructed parts. Used by tests
    /// that stub out the network-facing pieces.
    #[inline]
    pub fn from_parts(config: Config, recommender: Recommender, document_count: u64) -> Self {
        Self {
            config,
            recommender,
            document_count,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn document_count(&self) -> u64 {
        self.document_count
    }

    #[inline]
    pub async fn recommend(&self, query: &str) -> Result<String, AnirecError> {
        self.recommender.recommend(query).await
    }
}
