// Index module
// Persisted chunk index (LanceDB) and the similarity search contract the answerer uses


pub mod lancedb;
pub mod memory;

pub use self::lancedb::{IndexEntry, IndexStore};
pub use memory::InMemoryIndex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Unit of source text stored in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
}

/// A chunk returned by a similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    /// Cosine similarity to the query, higher is closer
    pub score: f32,
}

/// Nearest-neighbor lookup over stored chunk vectors.
///
/// Implementations never modify the stored chunks. Results are ordered most
/// similar first, ties keep insertion order, and at most `k` are returned.
#[async_trait]
pub trait ChunkSearch: Send + Sync {
    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;
}

/// A search hit before ranking
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub ordinal: u32,
    pub chunk: DocumentChunk,
    pub distance: f32,
}

/// Order by ascending distance, then insertion ordinal, and keep the first `k`.
pub(crate) fn rank(mut candidates: Vec<Candidate>, k: usize) -> Vec<ScoredChunk> {
    candidates.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.ordinal.cmp(&b.ordinal))
    });
    candidates.truncate(k);

    candidates
        .into_iter()
        .map(|candidate| ScoredChunk {
            chunk: candidate.chunk,
            score: 1.0 - candidate.distance,
        })
        .collect()
}

/// Cosine distance (`1 - cosine similarity`). Zero vectors are treated as
/// orthogonal to everything.
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0_f32, 0.0_f32, 0.0_f32), |(dot, na, nb), (x, y)| {
            (x.mul_add(*y, dot), x.mul_add(*x, na), y.mul_add(*y, nb))
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}
