// Vector index module
// Handles document construction and LanceDB-backed similarity search

pub mod vector_store;

use serde::{Deserialize, Serialize};

use crate::data::ProcessedRecord;

pub use vector_store::{ScoredDocument, VectorStore};

/// Unit of retrieval, derived 1:1 from one processed anime record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// MyAnimeList identifier, the join key of the source dataset
    pub mal_id: u32,
    pub title: String,
    pub genres: String,
    pub synopsis: String,
    /// Text blob submitted to the embedding model and stuffed into prompts
    pub content: String,
}

impl Document {
    #[inline]
    pub fn from_record(record: &ProcessedRecord) -> Self {
        let content = format!(
            "Title: {}\nGenres: {}\nSynopsis: {}",
            record.title, record.genres, record.synopsis
        );
        Self {
            mal_id: record.mal_id,
            title: record.title.clone(),
            genres: record.genres.clone(),
            synopsis: record.synopsis.clone(),
            content,
        }
    }
}

/// A document paired with its embedding vector, ready for indexing
#[derive(Debug, Clone)]
pub struct DocumentEmbedding {
    pub document: Document,
    pub vector: Vec<f32>,
}
