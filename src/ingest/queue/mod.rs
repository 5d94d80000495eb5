// Durable change queue
// The content store enqueues change events; draining feeds the ingestor


use anyhow::Context;
use chrono::{NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::config::{IngestConfig, IngestFailureMode};
use crate::ingest::{ContentRecord, Ingestor};
use crate::{RagError, Result};

pub type DbPool = Pool<Sqlite>;

const DRAIN_BATCH_SIZE: usize = 64;

/// SQLite-backed queue of content-change events.
///
/// Decouples index updates from the content store's save path: the store
/// enqueues and returns, and a drain later embeds and upserts the records.
/// Events survive process restarts; failed batches are retried on the next
/// drain up to the configured retry limit.
#[derive(Debug, Clone)]
pub struct ChangeQueue {
    pool: DbPool,
}

/// A queued change event carrying the content record snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub id: i64,
    pub record: ContentRecord,
    pub retry_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct PendingChangeRow {
    id: i64,
    record_id: String,
    payload: String,
    retry_count: i64,
    #[expect(dead_code, reason = "read for completeness of the row shape")]
    created_date: NaiveDateTime,
}

/// Counts per queue status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub pending: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ChangeQueue {
    /// Open (or create) the queue database at the given path.
    #[inline]
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create queue database directory")?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create queue connection pool")?;

        sqlx::migrate!("src/ingest/queue/migrations")
            .run(&pool)
            .await
            .context("Failed to run queue migrations")?;

        debug!("Change queue opened");
        Ok(Self { pool })
    }

    /// Record a change notification. One row per affected record.
    #[inline]
    pub async fn enqueue(&self, records: &[ContentRecord]) -> Result<usize> {
        let now = Utc::now().naive_utc();

        for record in records {
            let payload = serde_json::to_string(record)
                .context("Failed to serialize content record")?;

            sqlx::query(
                "INSERT INTO pending_changes (record_id, payload, status, retry_count, created_date) \
                 VALUES (?, ?, 'pending', 0, ?)",
            )
            .bind(&record.id)
            .bind(payload)
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to enqueue change event")?;
        }

        debug!("Enqueued {} change events", records.len());
        Ok(records.len())
    }

    /// Fetch the oldest pending events, oldest first. Rows whose payload no
    /// longer parses are parked as failed instead of being returned.
    #[inline]
    pub async fn next_batch(&self, limit: usize) -> Result<Vec<PendingChange>> {
        let rows: Vec<PendingChangeRow> = sqlx::query_as(
            "SELECT id, record_id, payload, retry_count, created_date \
             FROM pending_changes \
             WHERE status = 'pending' \
             ORDER BY created_date ASC, id ASC \
             LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch pending change events")?;

        let mut batch = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str::<ContentRecord>(&row.payload) {
                Ok(record) => batch.push(PendingChange {
                    id: row.id,
                    record,
                    retry_count: row.retry_count,
                }),
                Err(e) => {
                    warn!(
                        "Parking change event {} for record {}: unreadable payload: {}",
                        row.id, row.record_id, e
                    );
                    self.park(row.id, &format!("unreadable payload: {}", e))
                        .await?;
                }
            }
        }

        debug!("Fetched batch of {} change events", batch.len());
        Ok(batch)
    }

    #[inline]
    pub async fn mark_completed(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE pending_changes SET status = 'completed', error_message = NULL WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to mark change event as completed")?;

        Ok(())
    }

    /// Record a failed attempt. The event stays pending for the next drain
    /// until it runs out of retries, then it is parked as failed.
    #[inline]
    pub async fn mark_failed(&self, id: i64, error_message: &str, max_retries: u32) -> Result<()> {
        sqlx::query(
            "UPDATE pending_changes \
             SET retry_count = retry_count + 1, \
                 error_message = ?, \
                 status = CASE WHEN retry_count + 1 >= ? THEN 'failed' ELSE 'pending' END \
             WHERE id = ?",
        )
        .bind(error_message)
        .bind(max_retries as i64)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to record change event failure")?;

        Ok(())
    }

    async fn park(&self, id: i64, error_message: &str) -> Result<()> {
        sqlx::query("UPDATE pending_changes SET status = 'failed', error_message = ? WHERE id = ?")
            .bind(error_message)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to park change event")?;

        Ok(())
    }

    #[inline]
    pub async fn stats(&self) -> Result<QueueStats> {
        let (pending, completed, failed): (i64, i64, i64) = sqlx::query_as(
            "SELECT \
                 COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0), \
                 COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0), \
                 COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0) \
             FROM pending_changes",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to get queue statistics")?;

        Ok(QueueStats {
            pending: pending.unsigned_abs(),
            completed: completed.unsigned_abs(),
            failed: failed.unsigned_abs(),
        })
    }

    /// Remove completed events older than the given number of days.
    #[inline]
    pub async fn cleanup_completed(&self, older_than_days: i64) -> Result<u64> {
        let cutoff = Utc::now().naive_utc() - chrono::Duration::days(older_than_days);

        let deleted = sqlx::query(
            "DELETE FROM pending_changes WHERE status = 'completed' AND created_date < ?",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .context("Failed to clean up completed change events")?
        .rows_affected();

        if deleted > 0 {
            info!("Cleaned up {} completed change events", deleted);
        }
        Ok(deleted)
    }

    /// Process pending events until the queue is empty, one ingest call per
    /// batch. Failure surfacing follows the configured mode: `block` stops
    /// at the first failed batch, `log-and-continue` records the failure
    /// and moves on. Transient failures are picked up again on the next
    /// pass until their retry budget runs out; non-transient ones are
    /// parked immediately.
    #[inline]
    pub async fn drain(&self, ingestor: &Ingestor, config: &IngestConfig) -> Result<DrainReport> {
        let mut report = DrainReport::default();

        loop {
            let batch = self.next_batch(DRAIN_BATCH_SIZE).await?;
            if batch.is_empty() {
                break;
            }

            let records: Vec<ContentRecord> =
                batch.iter().map(|event| event.record.clone()).collect();

            match ingestor.ingest(&records).await {
                Ok(ingest_report) => {
                    for event in &batch {
                        self.mark_completed(event.id).await?;
                    }
                    report.succeeded += ingest_report.succeeded;
                    report.skipped += ingest_report.skipped;
                }
                Err(e) => {
                    let message = e.to_string();
                    if e.is_transient() {
                        for event in &batch {
                            self.mark_failed(event.id, &message, config.max_retries)
                                .await?;
                        }
                    } else {
                        // Schema conflicts and caller errors do not heal on
                        // retry; park the events for operator attention.
                        for event in &batch {
                            self.park(event.id, &message).await?;
                        }
                    }
                    report.failed += batch.len();

                    match config.on_failure {
                        IngestFailureMode::Block => {
                            error!("Ingest batch failed, blocking drain: {}", message);
                            return Err(e);
                        }
                        IngestFailureMode::LogAndContinue => {
                            error!("Ingest batch failed, continuing drain: {}", message);
                        }
                    }
                }
            }
        }

        info!(
            "Drain complete: {} upserted, {} skipped, {} failed attempts",
            report.succeeded, report.skipped, report.failed
        );
        Ok(report)
    }
}
