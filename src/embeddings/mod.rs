// Embeddings module
// Handles Ollama integration for turning documents and queries into vectors

pub mod ollama;

pub use ollama::{DEFAULT_EMBEDDING_DIMENSION, OllamaClient};
