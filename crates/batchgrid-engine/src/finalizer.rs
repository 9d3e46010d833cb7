//! Finalizer: computes and publishes a batch's terminal outcome.

use std::sync::Arc;

use tracing::{info, warn};

use batchgrid_bus::topic::{batch_done_subject, batch_error_subject};
use batchgrid_bus::{Publisher, publish_json};
use batchgrid_state::{BatchRepository, BatchRequest, BatchStatus};

use crate::error::EngineResult;

/// Error code for a batch rejected at intake because an item is invalid.
pub const VALIDATION_ERROR_CODE: &str = "0001";

/// Error code for a batch in which at least one item errored.
pub const AGGREGATE_ERROR_CODE: &str = "0002";

pub const AGGREGATE_ERROR_MESSAGE: &str = "some instances could not be successfully processed";

#[derive(Clone)]
pub struct Finalizer {
    publisher: Arc<dyn Publisher>,
    repository: BatchRepository,
}

impl Finalizer {
    pub fn new(publisher: Arc<dyn Publisher>, repository: BatchRepository) -> Self {
        Self {
            publisher,
            repository,
        }
    }

    /// Settle a batch whose items are all terminal.
    ///
    /// Every item is considered: one errored item anywhere forces the
    /// aggregate error, whatever the triggering notification reported.
    pub async fn finalize(&self, batch: &mut BatchRequest) -> EngineResult<BatchStatus> {
        if batch.has_errored_items() {
            self.fail(batch, AGGREGATE_ERROR_CODE, AGGREGATE_ERROR_MESSAGE)
                .await?;
        } else {
            self.complete(batch).await?;
        }
        Ok(batch.status)
    }

    /// Mark the batch completed, persist it, and publish on `.done`.
    pub async fn complete(&self, batch: &mut BatchRequest) -> EngineResult<()> {
        batch.mark_completed();
        self.repository.save(batch).await?;
        publish_json(
            self.publisher.as_ref(),
            &batch_done_subject(batch.action),
            &*batch,
        )
        .await?;
        info!(
            service = %batch.service_id,
            action = %batch.action,
            items = batch.items.len(),
            "batch completed"
        );
        Ok(())
    }

    /// Mark the batch failed, persist it, and publish on `.error`.
    pub async fn fail(&self, batch: &mut BatchRequest, code: &str, message: &str) -> EngineResult<()> {
        batch.mark_error(code, message);
        self.repository.save(batch).await?;
        publish_json(
            self.publisher.as_ref(),
            &batch_error_subject(batch.action),
            &*batch,
        )
        .await?;
        warn!(
            service = %batch.service_id,
            action = %batch.action,
            code,
            message,
            "batch failed"
        );
        Ok(())
    }
}
