//! Routes bus deliveries to intake or the aggregator.

use std::sync::Arc;

use tracing::debug;

use batchgrid_bus::{Delivery, Publisher, Route};
use batchgrid_state::codec;
use batchgrid_state::{BatchRepository, CacheKey, KvStore};

use crate::aggregator::{AggregateOutcome, Aggregator};
use crate::error::{EngineError, EngineResult};
use crate::intake::{IntakeOutcome, IntakeService};

/// Result of handling one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    Intake(IntakeOutcome),
    Outcome(AggregateOutcome),
}

pub struct Coordinator {
    intake: IntakeService,
    aggregator: Aggregator,
}

impl Coordinator {
    pub fn new(publisher: Arc<dyn Publisher>, store: Arc<dyn KvStore>) -> Self {
        let repository = BatchRepository::new(store);
        Self {
            intake: IntakeService::new(publisher.clone(), repository.clone()),
            aggregator: Aggregator::new(publisher, repository),
        }
    }

    /// Every subject the coordinator consumes.
    pub fn subjects() -> Vec<String> {
        Route::all().iter().map(Route::subject).collect()
    }

    /// The cache key a delivery will read or write, used to pick its lane.
    ///
    /// `None` when the subject is unroutable or the payload carries no
    /// service id; such deliveries still go to a lane and fail there.
    pub fn routing_key(delivery: &Delivery) -> Option<CacheKey> {
        let route = Route::parse(&delivery.subject)?;
        let field = match route {
            Route::Intake(_) => "service",
            Route::Outcome { .. } => "service_id",
        };
        let service_id = codec::peek_str(&delivery.payload, field)?;
        Some(CacheKey::compose(&service_id, route.action()))
    }

    pub async fn handle(&self, delivery: &Delivery) -> EngineResult<Handled> {
        let route = Route::parse(&delivery.subject)
            .ok_or_else(|| EngineError::Unroutable(delivery.subject.clone()))?;
        debug!(subject = %delivery.subject, bytes = delivery.payload.len(), "delivery received");

        match route {
            Route::Intake(action) => self
                .intake
                .handle(action, &delivery.payload)
                .await
                .map(Handled::Intake),
            Route::Outcome { action, status } => self
                .aggregator
                .handle(action, status, &delivery.payload)
                .await
                .map(Handled::Outcome),
        }
    }
}
