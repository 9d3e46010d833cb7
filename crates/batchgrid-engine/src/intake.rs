//! Request intake: accepts a batch, validates it, and fans out work orders.

use std::sync::Arc;

use tracing::{debug, info};

use batchgrid_bus::topic::work_order_subject;
use batchgrid_bus::{Publisher, publish_json};
use batchgrid_state::codec;
use batchgrid_state::{Action, BatchRepository, BatchRequest, BatchStatus, ItemStatus, ItemWorkOrder};

use crate::error::EngineResult;
use crate::finalizer::{Finalizer, VALIDATION_ERROR_CODE};
use crate::lifecycle::{ItemInvalid, ItemLifecycle, first_invalid};

/// What intake did with a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Work orders were published for `count` items.
    Dispatched { count: usize },
    /// Nothing needed doing; the batch was finalized as completed.
    Completed,
    /// An item failed validation; the batch was finalized as an error.
    Rejected(ItemInvalid),
}

#[derive(Clone)]
pub struct IntakeService {
    publisher: Arc<dyn Publisher>,
    repository: BatchRepository,
    finalizer: Finalizer,
}

impl IntakeService {
    pub fn new(publisher: Arc<dyn Publisher>, repository: BatchRepository) -> Self {
        let finalizer = Finalizer::new(publisher.clone(), repository.clone());
        Self {
            publisher,
            repository,
            finalizer,
        }
    }

    /// Handle one batch request received on `instances.<action>`.
    pub async fn handle(&self, action: Action, payload: &[u8]) -> EngineResult<IntakeOutcome> {
        let mut batch = codec::decode_batch(payload, action)?;
        info!(
            service = %batch.service_id,
            action = %action,
            items = batch.items.len(),
            sequential = batch.sequential_processing,
            "batch received"
        );

        self.repository.save(&batch).await?;

        if batch.items.is_empty() || batch.status == BatchStatus::Completed {
            self.finalizer.complete(&mut batch).await?;
            return Ok(IntakeOutcome::Completed);
        }

        if let Some(invalid) = first_invalid(&batch.items) {
            self.finalizer
                .fail(&mut batch, VALIDATION_ERROR_CODE, &invalid.to_string())
                .await?;
            return Ok(IntakeOutcome::Rejected(invalid));
        }

        batch.reopen();
        let count = self.fan_out(&mut batch).await?;
        if count == 0 {
            self.finalizer.complete(&mut batch).await?;
            return Ok(IntakeOutcome::Completed);
        }

        self.repository.save(&batch).await?;
        Ok(IntakeOutcome::Dispatched { count })
    }

    /// Publish work orders for every item not yet completed, or only the
    /// first such item for a sequential batch.
    async fn fan_out(&self, batch: &mut BatchRequest) -> EngineResult<usize> {
        let subject = work_order_subject(batch.action);
        let mut count = 0;

        for item in batch
            .items
            .iter_mut()
            .filter(|item| item.status != ItemStatus::Completed)
        {
            item.mark_processing();
            let order = ItemWorkOrder::for_item(item, &batch.service_id, &subject);
            publish_json(self.publisher.as_ref(), &subject, &order).await?;
            debug!(service = %batch.service_id, item = %item.name, %subject, "work order published");
            count += 1;

            if batch.sequential_processing {
                break;
            }
        }
        Ok(count)
    }
}
