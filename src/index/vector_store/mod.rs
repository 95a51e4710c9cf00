
use super::{Document, DocumentEmbedding};
use crate::AnirecError;
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const TABLE_NAME: &str = "anime";
const INSERT_BATCH_SIZE: usize = 512;

/// Persistent vector index over anime documents, backed by LanceDB.
///
/// Built wholesale by the offline pipeline and opened read-only at serve
/// time. There is no incremental update; a source-data change means a full
/// rebuild.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    dimension: usize,
}

/// One similarity-search hit
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    pub similarity: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Open (or create) the index directory.
    ///
    /// The table itself is only created by `rebuild`; opening an index that
    /// was never built succeeds, but searches against it fail with an
    /// `Index` error.
    #[inline]
    pub async fn open(index_dir: &Path, dimension: usize) -> Result<Self, AnirecError> {
        debug!("Opening LanceDB index at {:?}", index_dir);

        std::fs::create_dir_all(index_dir).map_err(|e| {
            AnirecError::Index(format!("Failed to create index directory: {}", e))
        })?;

        let uri = format!("file://{}", index_dir.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AnirecError::Index(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            dimension,
        })
    }

    /// Whether the index table has been built
    #[inline]
    pub async fn is_built(&self) -> Result<bool, AnirecError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| AnirecError::Index(format!("Failed to list tables: {}", e)))?;
        Ok(table_names.contains(&self.table_name))
    }

    /// Replace the index wholesale with the given documents.
    ///
    /// The previous table is dropped only after every record has been
    /// validated, so a bad input set never leaves a half-built index.
    #[inline]
    pub async fn rebuild(&self, records: &[DocumentEmbedding]) -> Result<(), AnirecError> {
        if records.is_empty() {
            return Err(AnirecError::Index(
                "Refusing to build an empty index".to_string(),
            ));
        }

        for record in records {
            if record.vector.len() != self.dimension {
                return Err(AnirecError::Index(format!(
                    "Vector dimension mismatch for '{}': expected {}, got {}",
                    record.document.title,
                    self.dimension,
                    record.vector.len()
                )));
            }
        }

        info!(
            "Rebuilding index with {} documents ({} dimensions)",
            records.len(),
            self.dimension
        );

        self.drop_table_if_exists().await?;

        let schema = self.schema();
        self.connection
            .create_empty_table(&self.table_name, Arc::clone(&schema))
            .execute()
            .await
            .map_err(|e| AnirecError::Index(format!("Failed to create table: {}", e)))?;

        let table = self.open_table().await?;
        let indexed_at = Utc::now().to_rfc3339();

        for chunk in records.chunks(INSERT_BATCH_SIZE) {
            let record_batch = self.create_record_batch(chunk, &indexed_at)?;
            let reader =
                RecordBatchIterator::new(std::iter::once(Ok(record_batch)), Arc::clone(&schema));
            table
                .add(reader)
                .execute()
                .await
                .map_err(|e| AnirecError::Index(format!("Failed to insert documents: {}", e)))?;
        }

        if let Err(e) = table.optimize(lancedb::table::OptimizeAction::All).await {
            warn!("Failed to optimize index after rebuild: {}", e);
        }

        // An ANN index speeds up search on larger datasets but LanceDB
        // rejects it below a minimum row count; brute force is fine there.
        if let Err(e) = table
            .create_index(&["vector"], lancedb::index::Index::Auto)
            .execute()
            .await
        {
            debug!("Skipping vector index creation: {}", e);
        }

        info!("Index rebuilt with {} documents", records.len());
        Ok(())
    }

    /// Search for the `limit` documents most similar to the query vector
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, AnirecError> {
        debug!("Searching for similar documents with limit: {}", limit);

        let table = self.open_table().await?;

        let results = table
            .vector_search(query_vector)
            .map_err(|e| AnirecError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| AnirecError::Index(format!("Failed to execute search: {}", e)))?;

        self.parse_results_stream(results).await
    }

    /// Total number of indexed documents
    #[inline]
    pub async fn count_documents(&self) -> Result<u64, AnirecError> {
        let table = self.open_table().await?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| AnirecError::Index(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    async fn open_table(&self) -> Result<lancedb::Table, AnirecError> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| {
                AnirecError::Index(format!(
                    "Failed to open index table (has the index been built?): {}",
                    e
                ))
            })
    }

    async fn drop_table_if_exists(&self) -> Result<(), AnirecError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| AnirecError::Index(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            info!("Dropping existing index table");
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| AnirecError::Index(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("mal_id", DataType::UInt32, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("genres", DataType::Utf8, false),
            Field::new("synopsis", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("indexed_at", DataType::Utf8, false),
        ]))
    }

    fn create_record_batch(
        &self,
        records: &[DocumentEmbedding],
        indexed_at: &str,
    ) -> Result<RecordBatch, AnirecError> {
        let len = records.len();

        let mut mal_ids = Vec::with_capacity(len);
        let mut titles = Vec::with_capacity(len);
        let mut genres = Vec::with_capacity(len);
        let mut synopses = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut indexed_ats = Vec::with_capacity(len);

        let mut flat_values = Vec::with_capacity(len * self.dimension);
        for record in records {
            mal_ids.push(record.document.mal_id);
            titles.push(record.document.title.as_str());
            genres.push(record.document.genres.as_str());
            synopses.push(record.document.synopsis.as_str());
            contents.push(record.document.content.as_str());
            indexed_ats.push(indexed_at);
            flat_values.extend_from_slice(&record.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| AnirecError::Index(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(UInt32Array::from(mal_ids)),
            Arc::new(StringArray::from(titles)),
            Arc::new(StringArray::from(genres)),
            Arc::new(StringArray::from(synopses)),
            Arc::new(StringArray::from(contents)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(indexed_ats)),
        ];

        RecordBatch::try_new(self.schema(), arrays)
            .map_err(|e| AnirecError::Index(format!("Failed to create record batch: {}", e)))
    }

    async fn parse_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<ScoredDocument>, AnirecError> {
        let mut scored = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| AnirecError::Index(format!("Failed to read result stream: {}", e)))?
        {
            scored.extend(self.parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search results from stream", scored.len());
        Ok(scored)
    }

    fn parse_search_batch(&self, batch: &RecordBatch) -> Result<Vec<ScoredDocument>, AnirecError> {
        let num_rows = batch.num_rows();

        let mal_ids = Self::column::<UInt32Array>(batch, "mal_id")?;
        let titles = Self::column::<StringArray>(batch, "title")?;
        let genres = Self::column::<StringArray>(batch, "genres")?;
        let synopses = Self::column::<StringArray>(batch, "synopsis")?;
        let contents = Self::column::<StringArray>(batch, "content")?;

        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut scored = Vec::with_capacity(num_rows);
        for row in 0..num_rows {
            let document = Document {
                mal_id: mal_ids.value(row),
                title: titles.value(row).to_string(),
                genres: genres.value(row).to_string(),
                synopsis: synopses.value(row).to_string(),
                content: contents.value(row).to_string(),
            };

            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            // Convert distance to similarity score (higher is better)
            let similarity = 1.0 - distance;

            scored.push(ScoredDocument {
                document,
                similarity,
                distance,
            });
        }

        Ok(scored)
    }

    fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, AnirecError> {
        batch
            .column_by_name(name)
            .ok_or_else(|| AnirecError::Index(format!("Missing {} column", name)))?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| AnirecError::Index(format!("Invalid {} column type", name)))
    }
}
