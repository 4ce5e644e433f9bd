
use tracing::debug;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// A piece of a source document ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Stable identifier, `"{source}#{chunk_index}"`
    pub id: String,
    /// The document the chunk was cut from
    pub source: String,
    /// Index of this chunk within its document
    pub chunk_index: usize,
    pub text: String,
}

/// Configuration for paragraph chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Paragraphs are packed together until a chunk would exceed this many characters
    pub target_chars: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self { target_chars: 1200 }
    }
}

/// Split a document into chunks of whole paragraphs.
///
/// Paragraphs are separated by blank lines. Consecutive paragraphs share a
/// chunk while the chunk stays within `target_chars`; a paragraph longer than
/// that is split at word boundaries.
#[inline]
pub fn chunk_text(source: &str, text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let target = config.target_chars.max(1);

    let pieces = paragraphs(text)
        .into_iter()
        .flat_map(|paragraph| split_long_paragraph(&paragraph, target));

    let mut bodies: Vec<String> = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        if current.is_empty() {
            current = piece;
        } else if char_len(&current) + PARAGRAPH_SEPARATOR.len() + char_len(&piece) <= target {
            current.push_str(PARAGRAPH_SEPARATOR);
            current.push_str(&piece);
        } else {
            bodies.push(std::mem::replace(&mut current, piece));
        }
    }
    if !current.is_empty() {
        bodies.push(current);
    }

    let chunks: Vec<TextChunk> = bodies
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| TextChunk {
            id: format!("{}#{}", source, chunk_index),
            source: source.to_string(),
            chunk_index,
            text,
        })
        .collect();

    debug!("Chunked '{}' into {} chunks", source, chunks.len());
    chunks
}

fn paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !lines.is_empty() {
                paragraphs.push(lines.join("\n"));
                lines.clear();
            }
        } else {
            lines.push(line.trim_end());
        }
    }
    if !lines.is_empty() {
        paragraphs.push(lines.join("\n"));
    }

    paragraphs
}

fn split_long_paragraph(paragraph: &str, target: usize) -> Vec<String> {
    if char_len(paragraph) <= target {
        return vec![paragraph.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();

    for word in paragraph.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if char_len(&current) + 1 + char_len(word) <= target {
            current.push(' ');
            current.push_str(word);
        } else {
            pieces.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
