
use arrow::datatypes::{DataType, Field, Schema};
use lancedb::Connection;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::{RagError, Result};

/// Declared layout of the catalog index: a keyed document table with one
/// fixed-dimensionality vector column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub index_name: String,
    pub dimensions: usize,
}

impl IndexSchema {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            index_name: config.index.name.clone(),
            dimensions: config.embedding.dimensions as usize,
        }
    }

    /// Arrow rendering of the document layout. The vector column must match
    /// the embedding model's dimensionality before any write.
    #[inline]
    pub fn arrow_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimensions as i32,
                ),
                false,
            ),
            Field::new("indexed_at", DataType::Utf8, false),
        ]))
    }
}

/// Ensures the index exists with the declared layout before any upsert or
/// query. Runs once at store connect time, not per request.
pub struct SchemaManager {
    connection: Connection,
}

impl SchemaManager {
    #[inline]
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Create-or-update semantics: creating an index that already exists
    /// with a matching layout is a no-op, never an error. An existing index
    /// with a different vector dimensionality cannot be altered in place
    /// and fails with `SchemaConflict`.
    #[inline]
    pub async fn ensure_schema(&self, schema: &IndexSchema) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&schema.index_name) {
            let existing = self.existing_vector_dimensions(&schema.index_name).await?;
            if existing != schema.dimensions {
                return Err(RagError::SchemaConflict {
                    existing,
                    configured: schema.dimensions,
                });
            }

            debug!(
                "Index '{}' already exists with {} dimensions",
                schema.index_name, schema.dimensions
            );
            return Ok(());
        }

        self.connection
            .create_empty_table(&schema.index_name, schema.arrow_schema())
            .execute()
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("Failed to create index: {}", e)))?;

        info!(
            "Created index '{}' with {} dimensions",
            schema.index_name, schema.dimensions
        );
        Ok(())
    }

    /// Read the vector column's dimensionality from an existing table.
    async fn existing_vector_dimensions(&self, index_name: &str) -> Result<usize> {
        let table = self
            .connection
            .open_table(index_name)
            .execute()
            .await
            .map_err(|e| {
                RagError::IndexUnavailable(format!("Failed to open existing index: {}", e))
            })?;

        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("Failed to read schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(RagError::SchemaMismatch(format!(
            "index '{}' has no fixed-size vector column",
            index_name
        )))
    }
}
