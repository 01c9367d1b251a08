
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table};
use tracing::{debug, info};
use uuid::Uuid;

use crate::embeddings::chunking::TextChunk;
use crate::{PlaygroundError, Result};

const CHUNKS_TABLE: &str = "chunks";

/// Store of persisted collections: one LanceDB directory per indexed
/// document under a shared root.
#[derive(Debug, Clone)]
pub struct CollectionStore {
    root: PathBuf,
}

/// A loaded collection, ready for similarity search. Read-only.
pub struct Collection {
    table: Table,
    dimension: usize,
}

/// One search hit: a chunk plus its similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub content: String,
    pub chunk_index: u32,
    pub similarity: f32,
    pub distance: f32,
}

impl CollectionStore {
    #[inline]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location for a collection directory name
    #[inline]
    pub fn location(&self, dir_name: &str) -> PathBuf {
        self.root.join(dir_name)
    }

    /// Build and persist a collection from chunks plus their vectors.
    ///
    /// An existing collection at the same location is replaced wholesale
    /// (last write wins). Nothing is written unless the whole batch is
    /// consistent.
    #[inline]
    pub async fn create(
        &self,
        location: &Path,
        chunks: &[TextChunk],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        if chunks.is_empty() {
            return Err(PlaygroundError::Other(anyhow!(
                "Refusing to create an empty collection"
            )));
        }
        if chunks.len() != vectors.len() {
            return Err(PlaygroundError::Other(anyhow!(
                "Chunk and vector counts differ: {} vs {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimension = vectors[0].len();
        if dimension == 0 || vectors.iter().any(|v| v.len() != dimension) {
            return Err(PlaygroundError::Other(anyhow!(
                "Vectors must share one non-zero dimension"
            )));
        }

        std::fs::create_dir_all(location)?;
        let connection = connect(location).await?;

        // Last write wins on name collisions
        let existing = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| malformed(location, "list tables", &e))?;
        if existing.iter().any(|name| name == CHUNKS_TABLE) {
            debug!("Replacing existing collection at {}", location.display());
            connection
                .drop_table(CHUNKS_TABLE)
                .await
                .map_err(|e| malformed(location, "drop table", &e))?;
        }

        let schema = chunks_schema(dimension);
        let table = connection
            .create_empty_table(CHUNKS_TABLE, Arc::clone(&schema))
            .execute()
            .await
            .map_err(|e| malformed(location, "create table", &e))?;

        let batch = build_record_batch(&schema, dimension, chunks, vectors)?;
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| malformed(location, "insert chunks", &e))?;

        info!(
            "Created collection at {} with {} chunks",
            location.display(),
            chunks.len()
        );
        Ok(())
    }

    /// Open a previously persisted collection.
    ///
    /// A missing directory or table is `IndexNotFound`; a directory that
    /// exists but cannot be read back is `MalformedIndex`.
    #[inline]
    pub async fn open(&self, location: &Path) -> Result<Collection> {
        if !location.is_dir() {
            return Err(PlaygroundError::IndexNotFound(
                location.display().to_string(),
            ));
        }

        let connection = connect(location).await?;

        let table = match connection.open_table(CHUNKS_TABLE).execute().await {
            Ok(table) => table,
            Err(e) => {
                let msg = e.to_string();
                if msg.to_lowercase().contains("not found") {
                    return Err(PlaygroundError::IndexNotFound(
                        location.display().to_string(),
                    ));
                }
                return Err(malformed(location, "open table", &e));
            }
        };

        let schema = table
            .schema()
            .await
            .map_err(|e| malformed(location, "read schema", &e))?;

        let dimension = schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                PlaygroundError::MalformedIndex(format!(
                    "{}: missing or invalid vector column",
                    location.display()
                ))
            })?;

        debug!(
            "Opened collection at {} (dimension {})",
            location.display(),
            dimension
        );

        Ok(Collection { table, dimension })
    }
}

impl Collection {
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return the `k` chunks nearest to the query vector, ranked by
    /// descending similarity
    #[inline]
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimension {
            return Err(PlaygroundError::MalformedIndex(format!(
                "Query dimension {} does not match collection dimension {}; the collection \
                 was likely built with a different embedding model",
                query.len(),
                self.dimension
            )));
        }

        let mut stream = self
            .table
            .vector_search(query)
            .map_err(|e| {
                PlaygroundError::MalformedIndex(format!("Failed to build search: {}", e))
            })?
            .column("vector")
            .limit(k)
            .execute()
            .await
            .map_err(|e| {
                PlaygroundError::MalformedIndex(format!("Failed to execute search: {}", e))
            })?;

        let mut results = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(|e| {
            PlaygroundError::MalformedIndex(format!("Failed to read search results: {}", e))
        })? {
            results.extend(parse_search_batch(&batch)?);
        }

        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(k);

        debug!("Search returned {} chunks", results.len());
        Ok(results)
    }
}

async fn connect(location: &Path) -> Result<Connection> {
    let uri = format!("file://{}", location.display());
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| malformed(location, "connect", &e))
}

fn malformed(location: &Path, action: &str, e: &lancedb::Error) -> PlaygroundError {
    PlaygroundError::MalformedIndex(format!("{}: failed to {}: {}", location.display(), action, e))
}

fn chunks_schema(dimension: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                dimension as i32,
            ),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

fn build_record_batch(
    schema: &Arc<Schema>,
    dimension: usize,
    chunks: &[TextChunk],
    vectors: &[Vec<f32>],
) -> Result<RecordBatch> {
    let len = chunks.len();
    let created_at = chrono::Utc::now().to_rfc3339();

    let mut ids = Vec::with_capacity(len);
    let mut contents = Vec::with_capacity(len);
    let mut chunk_indices = Vec::with_capacity(len);
    let mut created_ats = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * dimension);

    for (chunk, vector) in chunks.iter().zip(vectors) {
        ids.push(Uuid::new_v4().to_string());
        contents.push(chunk.content.as_str());
        chunk_indices.push(chunk.chunk_index as u32);
        created_ats.push(created_at.as_str());
        flat_values.extend_from_slice(vector);
    }

    let values_array = Float32Array::from(flat_values);
    let item_field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array =
        FixedSizeListArray::try_new(item_field, dimension as i32, Arc::new(values_array), None)
            .map_err(|e| {
                PlaygroundError::Other(anyhow!("Failed to create vector array: {}", e))
            })?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(contents)),
        Arc::new(UInt32Array::from(chunk_indices)),
        Arc::new(StringArray::from(created_ats)),
    ];

    RecordBatch::try_new(Arc::clone(schema), arrays)
        .map_err(|e| PlaygroundError::Other(anyhow!("Failed to create record batch: {}", e)))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<ScoredChunk>> {
    let contents = string_column(batch, "content")?;

    let chunk_indices = batch
        .column_by_name("chunk_index")
        .and_then(|col| col.as_any().downcast_ref::<UInt32Array>())
        .ok_or_else(|| {
            PlaygroundError::MalformedIndex("Missing or invalid chunk_index column".to_string())
        })?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut results = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        results.push(ScoredChunk {
            content: contents.value(row).to_string(),
            chunk_index: chunk_indices.value(row),
            similarity: 1.0 - distance,
            distance,
        });
    }

    Ok(results)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| {
            PlaygroundError::MalformedIndex(format!("Missing or invalid {} column", name))
        })
}
