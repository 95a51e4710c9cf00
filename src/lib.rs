use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnirecError>;

#[derive(Error, Debug)]
pub enum AnirecError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Context too large: {chars} characters exceeds the budget of {budget}")]
    TooMuchContext { chars: usize, budget: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod data;
pub mod embeddings;
pub mod index;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod recommender;
pub mod server;
