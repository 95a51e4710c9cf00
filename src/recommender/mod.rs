// Recommender module
// Binds the retriever and the hosted chat model into one query->answer chain


use tracing::{debug, info};

use crate::AnirecError;
use crate::embeddings::OllamaClient;
use crate::index::{ScoredDocument, VectorStore};
use crate::llm::GroqClient;
use crate::prompt::render_prompt;

/// Separator between retrieved documents inside the prompt context
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Explicit chain configuration, validated at construction rather than at
/// call time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommenderOptions {
    /// Number of documents to retrieve per query
    pub top_k: usize,
    /// Sampling temperature for the chat model
    pub temperature: f32,
    /// Upper bound on assembled context size before the chain refuses
    /// to stuff everything into one prompt
    pub max_context_chars: usize,
}

impl Default for RecommenderOptions {
    fn default() -> Self {
        Self {
            top_k: 4,
            temperature: 0.0,
            max_context_chars: 24_000,
        }
    }
}

impl RecommenderOptions {
    #[inline]
    pub fn validate(&self) -> Result<(), AnirecError> {
        if self.top_k == 0 || self.top_k > 50 {
            return Err(AnirecError::Config(format!(
                "top_k must be between 1 and 50, got {}",
                self.top_k
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AnirecError::Config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.max_context_chars < 1000 {
            return Err(AnirecError::Config(format!(
                "max_context_chars must be at least 1000, got {}",
                self.max_context_chars
            )));
        }
        Ok(())
    }
}

/// Retrieval-then-generate chain over the anime index
pub struct Recommender {
    store: VectorStore,
    embedder: OllamaClient,
    llm: GroqClient,
    options: RecommenderOptions,
}

impl Recommender {
    #[inline]
    pub fn new(
        store: VectorStore,
        embedder: OllamaClient,
        llm: GroqClient,
        options: RecommenderOptions,
    ) -> Result<Self, AnirecError> {
        options.validate()?;
        Ok(Self {
            store,
            embedder,
            llm,
            options,
        })
    }

    #[inline]
    pub fn options(&self) -> &RecommenderOptions {
        &self.options
    }

    #[inline]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Answer one free-text query: embed, retrieve top-K, render the
    /// prompt, ask the chat model. The model's text is returned verbatim;
    /// nothing checks that it actually contains three recommendations.
    #[inline]
    pub async fn recommend(&self, query: &str) -> Result<String, AnirecError> {
        debug!("Recommending for query (length: {})", query.len());

        let query_vector = self
            .embedder
            .embed(query)
            .map_err(|e| AnirecError::Embedding(format!("Failed to embed query: {}", e)))?;

        let hits = self
            .store
            .search_similar(&query_vector, self.options.top_k)
            .await?;

        info!("Retrieved {} documents for query", hits.len());

        let context = assemble_context(&hits, self.options.max_context_chars)?;
        let prompt = render_prompt(&context, query);

        let answer = self
            .llm
            .chat_completion(&prompt, self.options.temperature)
            .map_err(|e| AnirecError::Upstream(format!("Chat model call failed: {}", e)))?;

        Ok(answer)
    }
}

/// Concatenate retrieved documents into one context block, refusing to
/// exceed the configured budget instead of silently truncating.
pub(crate) fn assemble_context(
    hits: &[ScoredDocument],
    max_chars: usize,
) -> Result<String, AnirecError> {
    let context = hits
        .iter()
        .map(|hit| hit.document.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    if context.chars().count() > max_chars {
        return Err(AnirecError::TooMuchContext {
            chars: context.chars().count(),
            budget: max_chars,
        });
    }

    Ok(context)
}
