use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    /// Caller error; surfaced before any external call is made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Per-record ingestion failure; the rest of the batch continues.
    #[error("Record {id} is missing required field '{field}'")]
    MissingField { id: String, field: &'static str },

    /// The embedding or chat provider could not be reached or refused us.
    #[error("Model provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider throttled the request. Retry policy is the caller's.
    #[error("Model provider rate limited the request: {0}")]
    RateLimited(String),

    /// The vector index could not be reached or failed a request.
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// An existing index declares a different vector dimensionality and
    /// cannot be altered to match. Requires operator intervention.
    #[error("Index schema conflict: existing index has {existing} dimensions, configured {configured}")]
    SchemaConflict { existing: usize, configured: usize },

    /// A document or response vector does not match the declared schema.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Transient errors are worth retrying from a durable queue; the rest
    /// need operator attention or a fixed caller.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RagError::ProviderUnavailable(_) | RagError::RateLimited(_) | RagError::IndexUnavailable(_)
        )
    }
}

pub mod answer;
pub mod chat;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod ingest;
