//! Question answering
//!
//! Three ways to answer a question through the completion deployment:
//! pass the question straight through, ground it with a fixed context block,
//! or ground it with passages retrieved from the chunk index.


use clap::ValueEnum;
use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::completion::{Completer, Prompt};
use crate::config::Config;
use crate::embeddings::Embedder;
use crate::index::{ChunkSearch, ScoredChunk};
use crate::{RagError, Result};

/// Leading text of the system message in retrieval mode
pub const CONTEXT_PREAMBLE: &str = "Use the following context to answer:\n\n";

const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AnswerMode {
    /// Send the question alone
    Direct,
    /// Ground the question with the configured context block
    Grounded,
    /// Ground the question with passages retrieved from the index
    #[default]
    Retrieval,
}

impl std::fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Direct => "direct",
            Self::Grounded => "grounded",
            Self::Retrieval => "retrieval",
        };
        f.write_str(name)
    }
}

/// Per-answerer settings, taken from [`Config`]
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSettings {
    pub top_k: usize,
    pub grounding_context: String,
    pub direct_max_tokens: u32,
    pub direct_temperature: f32,
}

impl Default for AnswerSettings {
    #[inline]
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl AnswerSettings {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            grounding_context: config.grounding.context.clone(),
            direct_max_tokens: config.direct.max_tokens,
            direct_temperature: config.direct.temperature,
        }
    }
}

struct Retrieval {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn ChunkSearch>,
}

/// Answers questions with one completion call each.
///
/// Holds no per-request state, so one answerer can serve concurrent callers.
pub struct Answerer {
    settings: AnswerSettings,
    completer: Arc<dyn Completer>,
    retrieval: Option<Retrieval>,
}

impl Answerer {
    /// An answerer for the direct and grounded modes
    #[inline]
    pub fn new(settings: AnswerSettings, completer: Arc<dyn Completer>) -> Self {
        Self {
            settings,
            completer,
            retrieval: None,
        }
    }

    /// Enable retrieval mode with the given query embedder and chunk index
    #[inline]
    pub fn with_retrieval(
        mut self,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn ChunkSearch>,
    ) -> Self {
        self.retrieval = Some(Retrieval { embedder, index });
        self
    }

    /// Answer with passages retrieved from the index
    #[inline]
    pub async fn answer(&self, query: &str) -> Result<String> {
        self.answer_with_mode(AnswerMode::Retrieval, query).await
    }

    #[inline]
    pub async fn answer_with_mode(&self, mode: AnswerMode, query: &str) -> Result<String> {
        info!("Answering in {} mode", mode);

        let query = validate_query(query)?;
        debug!("User input: {}", query);

        let prompt = match mode {
            AnswerMode::Direct => Prompt::direct(query)
                .with_max_tokens(self.settings.direct_max_tokens)
                .with_temperature(self.settings.direct_temperature),
            AnswerMode::Grounded => {
                Prompt::grounded(self.settings.grounding_context.as_str(), query)
            }
            AnswerMode::Retrieval => self.retrieval_prompt(query).await?,
        };

        self.complete(&prompt)
    }

    /// Embed the query, search the index and build the two-message prompt
    async fn retrieval_prompt(&self, query: &str) -> Result<Prompt> {
        let retrieval = self.retrieval.as_ref().ok_or_else(|| {
            RagError::IndexUnavailable("no chunk index is loaded".to_string())
        })?;

        let query_vector = retrieval.embedder.embed(query).map_err(|e| {
            error!("Failed to generate embedding for query: {:#}", e);
            RagError::EmbeddingFailure(format!("{:#}", e))
        })?;

        let results = retrieval
            .index
            .search(&query_vector, self.settings.top_k)
            .await
            .inspect_err(|e| error!("Chunk search failed: {}", e))?;
        debug!(
            "Retrieved {} chunks: {:?}",
            results.len(),
            results.iter().map(|r| r.chunk.id.as_str()).collect::<Vec<_>>()
        );

        Ok(build_prompt(query, &assemble_context(&results)))
    }

    fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.completer.complete(prompt).map_err(|e| {
            error!("Completion call failed: {:#}", e);
            RagError::CompletionFailure(format!("{:#}", e))
        })
    }
}

/// Trim the question, rejecting one with nothing left
#[inline]
pub fn validate_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(RagError::EmptyQuery);
    }
    Ok(trimmed)
}

/// Join chunk texts in retrieval order, separated by a blank line
#[inline]
pub fn assemble_context(results: &[ScoredChunk]) -> String {
    results
        .iter()
        .map(|result| result.chunk.text.as_str())
        .join(CONTEXT_SEPARATOR)
}

/// Retrieval-mode prompt: the context under a fixed preamble, then the query
#[inline]
pub fn build_prompt(query: &str, context: &str) -> Prompt {
    Prompt::grounded(format!("{}{}", CONTEXT_PREAMBLE, context), query)
}
