use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Query is empty, please enter a question")]
    EmptyQuery,

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Query vector has {actual} dimensions but the index holds {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding error: {0}")]
    EmbeddingFailure(String),

    #[error("Completion error: {0}")]
    CompletionFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod answer;
pub mod commands;
pub mod completion;
pub mod config;
pub mod embeddings;
pub mod index;
