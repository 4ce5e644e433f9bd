#[cfg(test)]
mod tests;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Candidate, ChunkSearch, DocumentChunk, ScoredChunk, rank};
use crate::{RagError, Result};

pub const TABLE_NAME: &str = "chunks";

/// A chunk and its vector, as written by an index build
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: DocumentChunk,
    /// File the chunk was cut from
    pub source: String,
    pub vector: Vec<f32>,
}

/// Read-only handle on a persisted chunk index
pub struct IndexStore {
    table: Table,
    dimension: usize,
    path: PathBuf,
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("path", &self.path)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl IndexStore {
    /// Open the index persisted at `path`.
    ///
    /// Fails with [`RagError::IndexUnavailable`] when the directory is missing,
    /// holds no chunk table, or the table schema is not one this crate wrote.
    /// Nothing on disk is created or repaired.
    #[inline]
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(RagError::IndexUnavailable(format!(
                "index directory {} does not exist",
                path.display()
            )));
        }

        let path = path.canonicalize().map_err(|e| {
            RagError::IndexUnavailable(format!("cannot resolve {}: {}", path.display(), e))
        })?;
        debug!("Opening chunk index at {}", path.display());

        let connection = connect(&path)
            .await
            .map_err(|e| RagError::IndexUnavailable(e.to_string()))?;

        let table_names = connection.table_names().execute().await.map_err(|e| {
            RagError::IndexUnavailable(format!("failed to list tables: {}", e))
        })?;
        if !table_names.iter().any(|name| name == TABLE_NAME) {
            return Err(RagError::IndexUnavailable(format!(
                "no '{}' table in {}, build the index first",
                TABLE_NAME,
                path.display()
            )));
        }

        let table = connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("failed to open table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("failed to read schema: {}", e)))?;
        let dimension = validate_schema(&schema)?;

        info!(
            "Loaded chunk index at {} ({} dimensions)",
            path.display(),
            dimension
        );
        Ok(Self {
            table,
            dimension,
            path,
        })
    }

    /// Write a fresh index at `path`, replacing any chunk table already there.
    ///
    /// Entries keep the order given here; that order breaks ties at search time.
    #[inline]
    pub async fn create<P: AsRef<Path>>(
        path: P,
        dimension: usize,
        entries: &[IndexEntry],
    ) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::Other(anyhow::anyhow!(
                "index dimension must be greater than zero"
            )));
        }
        if let Some(entry) = entries.iter().find(|e| e.vector.len() != dimension) {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: entry.vector.len(),
            });
        }

        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let path = path.canonicalize()?;

        let connection = connect(&path).await.map_err(RagError::Other)?;

        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list tables: {}", e))?;
        if table_names.iter().any(|name| name == TABLE_NAME) {
            warn!("Replacing existing chunk index at {}", path.display());
            connection
                .drop_table(TABLE_NAME)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to drop table: {}", e))?;
        }

        let schema = create_schema(dimension)?;
        let table = connection
            .create_empty_table(TABLE_NAME, Arc::clone(&schema))
            .execute()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create table: {}", e))?;

        if !entries.is_empty() {
            let record_batch = create_record_batch(schema, dimension, entries)?;
            let batch_schema = record_batch.schema();
            let reader =
                RecordBatchIterator::new(std::iter::once(Ok(record_batch)), batch_schema);
            table
                .add(reader)
                .execute()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to insert chunks: {}", e))?;
        }

        info!(
            "Wrote {} chunks to index at {}",
            entries.len(),
            path.display()
        );
        Ok(Self {
            table,
            dimension,
            path,
        })
    }

    /// Vector dimension every stored chunk shares
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total number of stored chunks
    #[inline]
    pub async fn count(&self) -> Result<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("failed to count rows: {}", e)))
    }

    /// Exact cosine search over every stored vector
    async fn search_all(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query_vector.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        // Every row is scored so that ties at the cut-off are decided by
        // insertion order rather than by scan order.
        let total = self.count().await?;
        if total == 0 {
            debug!("Chunk index is empty");
            return Ok(Vec::new());
        }

        let mut stream = self
            .table
            .vector_search(query_vector)
            .map_err(|e| RagError::IndexUnavailable(format!("failed to create search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(total)
            .execute()
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("failed to execute search: {}", e)))?;

        let mut candidates = Vec::with_capacity(total);
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("failed to read results: {}", e)))?
        {
            candidates.extend(parse_search_batch(&batch)?);
        }

        let results = rank(candidates, k);
        debug!("Search returned {} of {} chunks", results.len(), total);
        Ok(results)
    }
}

#[async_trait]
impl ChunkSearch for IndexStore {
    #[inline]
    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        self.search_all(query_vector, k).await
    }
}

async fn connect(path: &Path) -> anyhow::Result<Connection> {
    let uri = format!("file://{}", path.display());
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to LanceDB at {}: {}", uri, e))
}

fn create_schema(dimension: usize) -> Result<Arc<Schema>> {
    let list_size = i32::try_from(dimension)
        .map_err(|_| anyhow::anyhow!("Vector dimension {} is too large", dimension))?;

    Ok(Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("ordinal", DataType::UInt32, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                list_size,
            ),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
    ])))
}

/// Check the columns search depends on and return the vector dimension
fn validate_schema(schema: &Schema) -> Result<usize> {
    for (name, expected) in [
        ("id", DataType::Utf8),
        ("ordinal", DataType::UInt32),
        ("content", DataType::Utf8),
    ] {
        match schema.field_with_name(name) {
            Ok(field) if *field.data_type() == expected => {}
            Ok(field) => {
                return Err(RagError::IndexUnavailable(format!(
                    "index is corrupt: column '{}' has type {}",
                    name,
                    field.data_type()
                )));
            }
            Err(_) => {
                return Err(RagError::IndexUnavailable(format!(
                    "index is corrupt: missing column '{}'",
                    name
                )));
            }
        }
    }

    let vector = schema.field_with_name("vector").map_err(|_| {
        RagError::IndexUnavailable("index is corrupt: missing column 'vector'".to_string())
    })?;
    match vector.data_type() {
        DataType::FixedSizeList(_, size) if *size > 0 => usize::try_from(*size)
            .map_err(|_| RagError::IndexUnavailable(format!("invalid vector size {}", size))),
        other => Err(RagError::IndexUnavailable(format!(
            "index is corrupt: vector column has type {}",
            other
        ))),
    }
}

fn create_record_batch(
    schema: Arc<Schema>,
    dimension: usize,
    entries: &[IndexEntry],
) -> Result<RecordBatch> {
    let len = entries.len();
    let created_at = chrono::Utc::now().to_rfc3339();

    let mut ids = Vec::with_capacity(len);
    let mut ordinals = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * dimension);
    let mut contents = Vec::with_capacity(len);
    let mut sources = Vec::with_capacity(len);

    for (entry, ordinal) in entries.iter().zip(0_u32..) {
        ids.push(entry.chunk.id.as_str());
        ordinals.push(ordinal);
        flat_values.extend_from_slice(&entry.vector);
        contents.push(entry.chunk.text.as_str());
        sources.push(entry.source.as_str());
    }

    let list_size = i32::try_from(dimension)
        .map_err(|_| anyhow::anyhow!("Vector dimension {} is too large", dimension))?;
    let field = Arc::new(Field::new("item", DataType::Float32, true));
    let vector_array = FixedSizeListArray::try_new(
        field,
        list_size,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| anyhow::anyhow!("Failed to create vector array: {}", e))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(UInt32Array::from(ordinals)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(contents)),
        Arc::new(StringArray::from(sources)),
        Arc::new(StringArray::from(vec![created_at.as_str(); len])),
    ];

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| RagError::Other(anyhow::anyhow!("Failed to create record batch: {}", e)))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<Candidate>> {
    let ids = string_column(batch, "id")?;
    let contents = string_column(batch, "content")?;
    let ordinals = batch
        .column_by_name("ordinal")
        .and_then(|col| col.as_any().downcast_ref::<UInt32Array>())
        .ok_or_else(|| RagError::IndexUnavailable("missing or invalid ordinal column".to_string()))?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| RagError::IndexUnavailable("search returned no distances".to_string()))?;

    let candidates = (0..batch.num_rows())
        .map(|row| Candidate {
            ordinal: ordinals.value(row),
            chunk: DocumentChunk {
                id: ids.value(row).to_string(),
                text: contents.value(row).to_string(),
            },
            distance: if distances.is_null(row) {
                f32::INFINITY
            } else {
                distances.value(row)
            },
        })
        .collect();

    Ok(candidates)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| RagError::IndexUnavailable(format!("missing or invalid {} column", name)))
}
