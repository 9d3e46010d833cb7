//! Completion aggregator: folds worker outcomes into the batch record.
//!
//! Each outcome updates one item, may dispatch the next pending item, and
//! hands the batch to the [`Finalizer`] once every item is terminal. At
//! most one item is dispatched per outcome, whether or not the batch asked
//! for sequential processing.

use std::sync::Arc;

use tracing::{debug, info, warn};

use batchgrid_bus::topic::work_order_subject;
use batchgrid_bus::{OutcomeStatus, Publisher, publish_json};
use batchgrid_state::codec;
use batchgrid_state::{
    Action, BatchRepository, BatchRequest, BatchStatus, CacheKey, ItemOutcome, ItemWorkOrder,
};

use crate::error::{EngineError, EngineResult};
use crate::finalizer::Finalizer;
use crate::lifecycle::{ItemLifecycle, Transition};

/// What the aggregator did with an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateOutcome {
    /// The batch was already terminal; the outcome was a late duplicate.
    AlreadyFinalized,
    /// Items are still outstanding. Carries the item dispatched next, if any.
    InFlight { dispatched: Option<String> },
    /// The outcome settled the batch.
    Finalized(BatchStatus),
}

#[derive(Clone)]
pub struct Aggregator {
    publisher: Arc<dyn Publisher>,
    repository: BatchRepository,
    finalizer: Finalizer,
}

impl Aggregator {
    pub fn new(publisher: Arc<dyn Publisher>, repository: BatchRepository) -> Self {
        let finalizer = Finalizer::new(publisher.clone(), repository.clone());
        Self {
            publisher,
            repository,
            finalizer,
        }
    }

    /// Handle one outcome received on `instance.<action>.done|error`.
    pub async fn handle(
        &self,
        action: Action,
        status: OutcomeStatus,
        payload: &[u8],
    ) -> EngineResult<AggregateOutcome> {
        let outcome = codec::decode_outcome(payload)?;
        let mut batch = self
            .repository
            .load(&outcome.service_id, action)
            .await?
            .ok_or_else(|| EngineError::BatchNotFound(CacheKey::compose(&outcome.service_id, action)))?;

        if batch.status.is_terminal() {
            debug!(
                service = %batch.service_id,
                action = %action,
                item = %outcome.instance_name,
                "outcome for finalized batch ignored"
            );
            return Ok(AggregateOutcome::AlreadyFinalized);
        }

        self.apply(&mut batch, status, &outcome);
        let (completed, dispatched) = self.schedule_next(&mut batch).await?;

        self.repository.save(&batch).await?;

        if completed {
            let status = self.finalizer.finalize(&mut batch).await?;
            return Ok(AggregateOutcome::Finalized(status));
        }
        Ok(AggregateOutcome::InFlight { dispatched })
    }

    fn apply(&self, batch: &mut BatchRequest, status: OutcomeStatus, outcome: &ItemOutcome) {
        let Some(item) = batch
            .items
            .iter_mut()
            .find(|item| item.name == outcome.instance_name)
        else {
            warn!(
                service = %batch.service_id,
                action = %batch.action,
                item = %outcome.instance_name,
                "outcome names no item in batch"
            );
            return;
        };

        match item.apply_outcome(status, outcome.error.as_ref()) {
            Transition::Applied { from, to } => info!(
                service = %batch.service_id,
                action = %batch.action,
                item = %item.name,
                %from,
                %to,
                "item transitioned"
            ),
            Transition::Unchanged => debug!(
                service = %batch.service_id,
                item = %item.name,
                "duplicate outcome"
            ),
            Transition::Rejected { from, to } => warn!(
                service = %batch.service_id,
                action = %batch.action,
                item = %item.name,
                %from,
                %to,
                "conflicting outcome for terminal item"
            ),
        }
    }

    /// Scan the items once: dispatch the first pending one, and report
    /// whether every item is terminal.
    async fn schedule_next(&self, batch: &mut BatchRequest) -> EngineResult<(bool, Option<String>)> {
        let mut completed = true;
        let mut dispatched = None;

        for item in batch.items.iter_mut() {
            if dispatched.is_none() && item.to_be_processed() {
                item.mark_processing();
                let subject = work_order_subject(batch.action);
                let order = ItemWorkOrder::for_item(item, &batch.service_id, &subject);
                publish_json(self.publisher.as_ref(), &subject, &order).await?;
                debug!(service = %batch.service_id, item = %item.name, %subject, "next item dispatched");
                dispatched = Some(item.name.clone());
            }
            if !item.status.is_terminal() {
                completed = false;
            }
        }
        Ok((completed, dispatched))
    }
}
