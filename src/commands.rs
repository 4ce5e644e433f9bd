use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::answer::{AnswerMode, AnswerSettings, Answerer, validate_query};
use crate::completion::AzureOpenAiClient;
use crate::config::Config;
use crate::embeddings::{ChunkingConfig, Embedder, OllamaClient, chunk_text};
use crate::index::{DocumentChunk, IndexEntry, IndexStore};

const DOCUMENT_EXTENSIONS: &[&str] = &["md", "txt"];

/// Summary of an index build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
}

/// Wire the answerer for `mode` from configuration.
///
/// The chunk index and embedding client are only set up for retrieval mode.
#[inline]
pub async fn build_answerer(config: &Config, mode: AnswerMode) -> crate::Result<Answerer> {
    config
        .validate()
        .map_err(|e| crate::RagError::Config(e.to_string()))?;

    let completer = AzureOpenAiClient::new(&config.completion)
        .context("Failed to create completion client")?;
    let answerer = Answerer::new(AnswerSettings::from_config(config), Arc::new(completer));

    if mode != AnswerMode::Retrieval {
        return Ok(answerer);
    }

    let embedder =
        OllamaClient::new(&config.ollama).context("Failed to create embedding client")?;
    let index = IndexStore::load(config.index_path()).await?;

    Ok(answerer.with_retrieval(Arc::new(embedder), Arc::new(index)))
}

/// Answer one question and return the model's reply
#[inline]
pub async fn ask(config: &Config, mode: AnswerMode, question: &str) -> crate::Result<String> {
    validate_query(question)?;

    let answerer = build_answerer(config, mode).await?;
    answerer.answer_with_mode(mode, question).await
}

/// Chunk every document under `source_dir`, embed the chunks and write a
/// fresh index at the configured location.
#[inline]
pub async fn build_index(config: &Config, source_dir: &Path) -> crate::Result<BuildStats> {
    config
        .validate_local()
        .map_err(|e| crate::RagError::Config(e.to_string()))?;

    let embedder =
        OllamaClient::new(&config.ollama).context("Failed to create embedding client")?;
    let chunking = ChunkingConfig {
        target_chars: config.retrieval.chunk_chars,
    };

    let (entries, documents) = embed_documents(&embedder, source_dir, &chunking)?;

    let dimension = entries
        .first()
        .map(|entry| entry.vector.len())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No .md or .txt content found under {}",
                source_dir.display()
            )
        })?;

    let index_path = config.index_path();
    let store = IndexStore::create(&index_path, dimension, &entries).await?;

    let stats = BuildStats {
        documents,
        chunks: store.count().await?,
        dimension,
    };
    info!(
        "Indexed {} chunks from {} documents into {}",
        stats.chunks,
        stats.documents,
        index_path.display()
    );
    Ok(stats)
}

/// Read, chunk and embed documents, returning index entries in build order
/// and the number of documents that produced at least one chunk.
#[inline]
pub fn embed_documents(
    embedder: &dyn Embedder,
    source_dir: &Path,
    chunking: &ChunkingConfig,
) -> Result<(Vec<IndexEntry>, usize)> {
    let files = collect_documents(source_dir)?;
    debug!("Found {} documents under {}", files.len(), source_dir.display());

    let mut chunks = Vec::new();
    let mut documents = 0;
    for file in &files {
        let text = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let source = file
            .strip_prefix(source_dir)
            .unwrap_or(file)
            .to_string_lossy()
            .replace('\\', "/");

        let document_chunks = chunk_text(&source, &text, chunking);
        if document_chunks.is_empty() {
            warn!("Skipping {}: no text", source);
            continue;
        }
        documents += 1;
        chunks.extend(document_chunks);
    }

    let progress = ProgressBar::new(chunks.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} Embedding [{bar:40}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("=> "),
    );

    let mut entries = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        progress.set_message(chunk.id.clone());
        let vector = embedder
            .embed(&chunk.text)
            .with_context(|| format!("Failed to embed chunk {}", chunk.id))?;

        let expected = entries
            .first()
            .map_or(vector.len(), |e: &IndexEntry| e.vector.len());
        if vector.len() != expected {
            return Err(anyhow::anyhow!(
                "Embedding for {} has {} dimensions, expected {}",
                chunk.id,
                vector.len(),
                expected
            ));
        }

        entries.push(IndexEntry {
            chunk: DocumentChunk {
                id: chunk.id,
                text: chunk.text,
            },
            source: chunk.source,
            vector,
        });
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok((entries, documents))
}

/// All `.md` and `.txt` files under `dir`, sorted by path
fn collect_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow::anyhow!("{} is not a directory", dir.display()));
    }

    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)
            .with_context(|| format!("Failed to read directory {}", current.display()))?
        {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    DOCUMENT_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                })
            {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Print the location and size of the chunk index
#[inline]
pub async fn show_status(config: &Config) -> crate::Result<()> {
    let index_path = config.index_path();

    eprintln!("{}", style("📚 Index Status").bold().cyan());
    eprintln!("  Location: {}", style(index_path.display()).cyan());

    match IndexStore::load(&index_path).await {
        Ok(store) => {
            eprintln!("  Chunks: {}", style(store.count().await?).cyan());
            eprintln!("  Dimensions: {}", style(store.dimension()).cyan());
        }
        Err(e) => {
            eprintln!("  {} {}", style("Unavailable:").red(), e);
            eprintln!("Use 'rag-answer build <dir>' to create the index.");
        }
    }

    Ok(())
}

/// Write a starter `config.toml` unless one already exists
#[inline]
pub fn init_config(config: &Config) -> Result<PathBuf> {
    let config_path = config.config_file_path();
    if config_path.exists() {
        eprintln!(
            "Configuration already exists at {}",
            style(config_path.display()).cyan()
        );
        return Ok(config_path);
    }

    // The API key stays in the environment
    let mut starter = config.clone();
    starter.completion.api_key = None;
    starter.write_to_disk()?;

    eprintln!(
        "{} {}",
        style("✓ Wrote configuration to").green(),
        style(config_path.display()).cyan()
    );
    Ok(config_path)
}
