#[cfg(test)]
mod tests;

use async_trait::async_trait;
use tracing::debug;

use super::{Candidate, ChunkSearch, DocumentChunk, ScoredChunk, cosine_distance, rank};
use crate::{RagError, Result};

/// Chunk index held entirely in memory, searched exhaustively.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    entries: Vec<(DocumentChunk, Vec<f32>)>,
    dimension: Option<usize>,
}

impl InMemoryIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from `(chunk, vector)` pairs in insertion order
    #[inline]
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (DocumentChunk, Vec<f32>)>,
    {
        let mut index = Self::new();
        for (chunk, vector) in entries {
            index.insert(chunk, vector)?;
        }
        Ok(index)
    }

    /// Append a chunk. Every vector must have the dimension of the first one.
    #[inline]
    pub fn insert(&mut self, chunk: DocumentChunk, vector: Vec<f32>) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != vector.len() => {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
            None => self.dimension = Some(vector.len()),
        }

        self.entries.push((chunk, vector));
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

#[async_trait]
impl ChunkSearch for InMemoryIndex {
    #[inline]
    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if let Some(expected) = self.dimension {
            if expected != query_vector.len() {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: query_vector.len(),
                });
            }
        }

        let candidates = self
            .entries
            .iter()
            .zip(0_u32..)
            .map(|((chunk, vector), ordinal)| Candidate {
                ordinal,
                chunk: chunk.clone(),
                distance: cosine_distance(query_vector, vector),
            })
            .collect();

        let results = rank(candidates, k);
        debug!(
            "In-memory search returned {} of {} chunks",
            results.len(),
            self.entries.len()
        );
        Ok(results)
    }
}
