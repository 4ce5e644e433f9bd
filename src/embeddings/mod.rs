// Embeddings module
// Query and chunk embeddings through Ollama, plus paragraph chunking for index builds

pub mod chunking;
pub mod ollama;

pub use chunking::{ChunkingConfig, TextChunk, chunk_text};
pub use ollama::OllamaClient;

/// Turns text into a dense vector.
///
/// One call per text, no retries: failures are reported to the caller as-is.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}
