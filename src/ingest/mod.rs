// Ingestion pipeline module
// Content-change events in, embedded catalog documents out

#[cfg(test)]
mod tests;

pub mod queue;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::embeddings::EmbeddingProvider;
use crate::index::{CatalogDocument, VectorIndex};
use crate::{RagError, Result};

/// Snapshot of a content record at change time. The content store owns the
/// source of truth; `body` models the CMS field that may be unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentRecord {
    pub id: String,
    pub title: String,
    pub body: Option<String>,
    pub content_type: String,
}

/// Outcome of one ingest call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    /// Documents built and upserted.
    pub succeeded: usize,
    /// Records filtered by content type or missing their body.
    pub skipped: usize,
}

/// Builds index documents from eligible content records and upserts them as
/// one batch per call.
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    content_type: String,
}

impl Ingestor {
    #[inline]
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            content_type: config.content_type.clone(),
        }
    }

    /// Process one change notification's worth of records.
    ///
    /// Ineligible content types and records without a body are skipped, not
    /// errored; the rest are embedded in one provider round trip and
    /// upserted in one index request. Transient provider or index failures
    /// fail the whole call — safe to retry because upsert fully replaces by
    /// id. An all-skipped batch performs no upsert at all.
    #[inline]
    pub async fn ingest(&self, records: &[ContentRecord]) -> Result<IngestReport> {
        debug!("Ingesting batch of {} records", records.len());

        let mut eligible = Vec::with_capacity(records.len());
        let mut skipped = 0_usize;

        for record in records {
            if !record.content_type.eq_ignore_ascii_case(&self.content_type) {
                debug!(
                    "Skipping record {}: content type '{}' is not eligible",
                    record.id, record.content_type
                );
                skipped += 1;
                continue;
            }

            match &record.body {
                Some(body) if !body.trim().is_empty() => {
                    eligible.push((record, body.clone()));
                }
                _ => {
                    let error = RagError::MissingField {
                        id: record.id.clone(),
                        field: "body",
                    };
                    warn!("Skipping record: {}", error);
                    skipped += 1;
                }
            }
        }

        if eligible.is_empty() {
            debug!("No eligible records in batch; skipping upsert");
            return Ok(IngestReport {
                succeeded: 0,
                skipped,
            });
        }

        let bodies: Vec<String> = eligible.iter().map(|(_, body)| body.clone()).collect();
        let vectors = self.embedder.embed_batch(&bodies)?;

        let indexed_at = Utc::now().to_rfc3339();
        let documents: Vec<CatalogDocument> = eligible
            .iter()
            .zip(vectors)
            .map(|((record, body), vector)| CatalogDocument {
                id: record.id.clone(),
                title: record.title.clone(),
                content: body.clone(),
                vector,
                indexed_at: indexed_at.clone(),
            })
            .collect();

        let succeeded = documents.len();
        self.index.upsert(documents).await?;

        info!(
            "Ingested batch: {} documents upserted, {} records skipped",
            succeeded, skipped
        );
        Ok(IngestReport { succeeded, skipped })
    }
}
