
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use itertools::Itertools;
use lancedb::{
    Connection, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::index::schema::{IndexSchema, SchemaManager};
use crate::index::{CatalogDocument, SearchHit, VectorIndex};
use crate::{RagError, Result};

/// LanceDB-backed catalog index supporting batch upsert and k-NN search.
pub struct VectorStore {
    connection: Connection,
    schema: IndexSchema,
}

impl VectorStore {
    /// Connect to the index directory and make sure the declared schema
    /// exists before any read or write.
    #[inline]
    pub async fn connect(config: &Config) -> Result<Self> {
        let db_path = config.vector_index_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(&db_path).map_err(|e| {
            RagError::IndexUnavailable(format!("Failed to create index directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("Failed to connect: {}", e)))?;

        let schema = IndexSchema::from_config(config);
        SchemaManager::new(connection.clone())
            .ensure_schema(&schema)
            .await?;

        info!("Vector store initialized for index '{}'", schema.index_name);
        Ok(Self { connection, schema })
    }

    async fn open_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.schema.index_name)
            .execute()
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("Failed to open index: {}", e)))
    }

    /// Total number of documents in the index.
    #[inline]
    pub async fn count_documents(&self) -> Result<u64> {
        let table = self.open_table().await?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Compact and reorganize the index data.
    #[inline]
    pub async fn optimize(&self) -> Result<()> {
        let table = self.open_table().await?;

        table
            .optimize(lancedb::table::OptimizeAction::All)
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("Failed to optimize index: {}", e)))?;

        debug!("Vector index optimization completed");
        Ok(())
    }

    fn create_record_batch(&self, documents: &[CatalogDocument]) -> Result<RecordBatch> {
        let len = documents.len();
        let dimensions = self.schema.dimensions;

        let mut ids = Vec::with_capacity(len);
        let mut titles = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut indexed_ats = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * dimensions);

        for document in documents {
            ids.push(document.id.as_str());
            titles.push(document.title.as_str());
            contents.push(document.content.as_str());
            indexed_ats.push(document.indexed_at.as_str());
            flat_values.extend_from_slice(&document.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, dimensions as i32, Arc::new(values_array), None)
                .map_err(|e| {
                    RagError::SchemaMismatch(format!("Failed to create vector array: {}", e))
                })?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(titles)),
            Arc::new(StringArray::from(contents)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(indexed_ats)),
        ];

        RecordBatch::try_new(self.schema.arrow_schema(), arrays)
            .map_err(|e| RagError::SchemaMismatch(format!("Failed to create record batch: {}", e)))
    }

    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::new();

        while let Some(batch_result) = results.try_next().await.map_err(|e| {
            RagError::IndexUnavailable(format!("Failed to read result stream: {}", e))
        })? {
            hits.extend(parse_search_batch(&batch_result)?);
        }

        // The limit clause already bounds the result set; this guards the
        // contract if the store returns more.
        hits.truncate(k);

        debug!("Parsed {} search hits from stream", hits.len());
        Ok(hits)
    }
}

#[async_trait]
impl VectorIndex for VectorStore {
    #[inline]
    async fn upsert(&self, documents: Vec<CatalogDocument>) -> Result<()> {
        if documents.is_empty() {
            debug!("No documents to upsert");
            return Ok(());
        }

        for document in &documents {
            if document.vector.len() != self.schema.dimensions {
                return Err(RagError::SchemaMismatch(format!(
                    "document {} has a {}-dimensional vector, index declares {}",
                    document.id,
                    document.vector.len(),
                    self.schema.dimensions
                )));
            }
        }

        debug!("Upserting batch of {} documents", documents.len());

        let record_batch = self.create_record_batch(&documents)?;
        let table = self.open_table().await?;

        // Full replace by primary key: remove any rows sharing the batch's
        // ids, then append the batch in one add request.
        let id_list = documents
            .iter()
            .map(|d| format!("'{}'", d.id.replace('\'', "''")))
            .join(", ");
        table
            .delete(&format!("id IN ({})", id_list))
            .await
            .map_err(|e| {
                RagError::IndexUnavailable(format!("Failed to delete replaced documents: {}", e))
            })?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("Failed to insert documents: {}", e)))?;

        info!("Upserted {} documents", documents.len());
        Ok(())
    }

    #[inline]
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        debug!("Searching for {} nearest neighbors", k);

        let table = self.open_table().await?;

        let query = table
            .vector_search(vector)
            .map_err(|e| {
                RagError::IndexUnavailable(format!("Failed to create vector search: {}", e))
            })?
            .column("vector")
            .limit(k);

        let results = query
            .execute()
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("Failed to execute search: {}", e)))?;

        self.parse_search_results_stream(results, k).await
    }
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchHit>> {
    let ids = string_column(batch, "id")?;
    let titles = string_column(batch, "title")?;
    let contents = string_column(batch, "content")?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut hits = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        hits.push(SearchHit {
            id: ids.value(row).to_string(),
            title: titles.value(row).to_string(),
            content: contents.value(row).to_string(),
            // Distance is smaller-is-closer; flip it so higher is better.
            score: 1.0 - distance,
        });
    }

    Ok(hits)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::SchemaMismatch(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::SchemaMismatch(format!("Invalid {} column type", name)))
}
