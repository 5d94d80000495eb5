// Vector index module
// Schema management, document storage, and k-NN similarity search

pub mod schema;
pub mod vector_store;

pub use schema::{IndexSchema, SchemaManager};
pub use vector_store::VectorStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Document stored in the vector index. Statically shaped: field names are
/// struct fields, not string keys, and `id` is the index primary key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogDocument {
    /// Mirrors the content record's identifier; upserting an existing id
    /// fully replaces the prior document.
    pub id: String,
    pub title: String,
    /// The text that was embedded.
    pub content: String,
    pub vector: Vec<f32>,
    /// RFC 3339 timestamp recorded when the document was built.
    pub indexed_at: String,
}

/// One similarity match. Ephemeral: exists only within a query's response.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Similarity measure; higher is closer.
    pub score: f32,
}

/// Index seam for the pipelines. The LanceDB store implements it; tests
/// substitute recording doubles.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert-or-replace a batch of documents keyed by id, as one request.
    /// An empty batch is a no-op.
    async fn upsert(&self, documents: Vec<CatalogDocument>) -> Result<()>;

    /// Return up to `k` hits ordered by non-increasing score. An index with
    /// zero documents yields an empty Vec, not an error.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>>;
}
