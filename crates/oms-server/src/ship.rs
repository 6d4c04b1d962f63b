//! Bulk-shipment jobs with persisted progress.
//!
//! The shipment loop runs on a background tokio task rather than inside an
//! open transaction: every progress update is its own storage call, so a
//! concurrent `GET /api/jobs/:id` observes the latest saved progress while
//! the job is still running, and a crash mid-run leaves an honest partial
//! record instead of a rolled-back blank.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use oms_domain::{OrderStatus, ProcessingStatus};
use oms_storage::{DataStore, StorageError, StorageResult};

/// Runs bulk-shipment jobs over a [`DataStore`].
#[derive(Debug)]
pub struct BulkShipRunner<S> {
    storage: Arc<S>,
}

impl<S: DataStore> BulkShipRunner<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Spawns `run` on a background task and returns immediately.
    ///
    /// The caller gets the join handle for tests and shutdown; the HTTP
    /// layer just drops it and lets the job finish on its own.
    pub fn spawn(self: &Arc<Self>, job_id: String, order_ids: Vec<i64>) -> JoinHandle<()> {
        let runner = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = runner.run(&job_id, &order_ids).await {
                warn!(job_id = %job_id, error = %e, "bulk shipment job aborted");
            }
        })
    }

    /// Processes the given orders, persisting progress after every item.
    ///
    /// Order ids that do not resolve are skipped, not fatal — the job still
    /// completes and the progress record counts them as processed. A storage
    /// failure aborts the loop and marks the job failed with the error.
    pub async fn run(&self, job_id: &str, order_ids: &[i64]) -> StorageResult<()> {
        let mut job = match self.storage.get_job(job_id).await {
            Ok(existing) => existing,
            Err(StorageError::JobNotFound { .. }) => ProcessingStatus::new(job_id),
            Err(other) => return Err(other),
        };

        let total = order_ids.len() as u32;
        job.mark_running(total);
        self.storage.save_job(&job).await?;
        info!(job_id, total, "bulk shipment started");

        let mut processed = 0;
        for &order_id in order_ids {
            match self
                .storage
                .update_order_status(order_id, OrderStatus::Processing)
                .await
            {
                Ok(()) => {}
                Err(StorageError::OrderNotFound { .. }) => {
                    warn!(job_id, order_id, "order missing, skipping");
                }
                Err(other) => {
                    job.mark_failed(other.to_string());
                    self.storage.save_job(&job).await?;
                    return Err(other);
                }
            }

            processed += 1;
            job.update_progress(processed, total);
            self.storage.save_job(&job).await?;
        }

        job.mark_completed();
        self.storage.save_job(&job).await?;
        info!(job_id, total, "bulk shipment completed");
        Ok(())
    }
}
