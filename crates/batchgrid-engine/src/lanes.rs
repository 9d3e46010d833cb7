//! Per-key serialization lanes.
//!
//! Every delivery is routed by its cache key to one of N lanes. A lane is
//! a single task consuming a bounded channel in order, so all messages
//! for one (service, action) key are handled one at a time while
//! different keys proceed in parallel.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use batchgrid_bus::Delivery;
use batchgrid_state::CacheKey;

use crate::coordinator::Coordinator;
use crate::error::{EngineError, EngineResult};

struct Lane {
    tx: mpsc::Sender<Delivery>,
    handle: JoinHandle<()>,
}

pub struct Lanes {
    lanes: Vec<Lane>,
}

impl Lanes {
    /// Spawn `count` lanes, each buffering up to `capacity` deliveries.
    pub fn spawn(coordinator: Arc<Coordinator>, count: usize, capacity: usize) -> Self {
        let count = count.max(1);
        let lanes = (0..count)
            .map(|index| {
                let (tx, rx) = mpsc::channel(capacity.max(1));
                let coordinator = coordinator.clone();
                let handle = tokio::spawn(async move {
                    run_lane(index, coordinator, rx).await;
                });
                Lane { tx, handle }
            })
            .collect();

        info!(lanes = count, capacity, "lanes started");
        Self { lanes }
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Queue a delivery on its key's lane. Waits while the lane is full.
    pub async fn dispatch(&self, delivery: Delivery) -> EngineResult<usize> {
        let key = Coordinator::routing_key(&delivery);
        let index = lane_index(key.as_ref(), self.lanes.len());
        self.lanes[index]
            .tx
            .send(delivery)
            .await
            .map_err(|_| EngineError::LaneClosed(index))?;
        Ok(index)
    }

    /// Close every lane and wait for queued deliveries to be handled.
    pub async fn shutdown(self) {
        for (index, lane) in self.lanes.into_iter().enumerate() {
            drop(lane.tx);
            if let Err(e) = lane.handle.await {
                warn!(lane = index, error = %e, "lane task failed");
            }
        }
        info!("lanes drained");
    }
}

/// Lane for `key`. Deliveries without a key share lane 0.
pub fn lane_index(key: Option<&CacheKey>, lanes: usize) -> usize {
    let Some(key) = key else {
        return 0;
    };
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % lanes.max(1) as u64) as usize
}

async fn run_lane(index: usize, coordinator: Arc<Coordinator>, mut rx: mpsc::Receiver<Delivery>) {
    debug!(lane = index, "lane running");

    while let Some(delivery) = rx.recv().await {
        match coordinator.handle(&delivery).await {
            Ok(handled) => {
                debug!(lane = index, subject = %delivery.subject, ?handled, "delivery handled")
            }
            Err(EngineError::BatchNotFound(key)) => {
                warn!(lane = index, subject = %delivery.subject, %key, "outcome for unknown batch dropped")
            }
            Err(e) => {
                warn!(lane = index, subject = %delivery.subject, error = %e, "delivery failed")
            }
        }
    }

    debug!(lane = index, "lane closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use batchgrid_state::{Action, BatchStatus};

    #[test]
    fn same_key_same_lane() {
        let key = CacheKey::compose("svc", Action::Create);
        let first = lane_index(Some(&key), 8);
        for _ in 0..16 {
            assert_eq!(lane_index(Some(&key.clone()), 8), first);
        }
        assert!(first < 8);
    }

    #[test]
    fn keyless_and_single_lane_go_to_zero() {
        assert_eq!(lane_index(None, 8), 0);
        let key = CacheKey::compose("svc", Action::Delete);
        assert_eq!(lane_index(Some(&key), 1), 0);
        assert_eq!(lane_index(Some(&key), 0), 0);
    }

    #[tokio::test]
    async fn intake_and_outcome_share_a_lane() {
        let h = Harness::new();
        let lanes = Lanes::spawn(
            Arc::new(Coordinator::new(h.publisher(), h.store.clone())),
            8,
            16,
        );
        assert_eq!(lanes.len(), 8);

        let b = batch("svc-7", Action::Update, vec![item("a")]);
        let intake = lanes
            .dispatch(Delivery::new("instances.update", payload(&b)))
            .await
            .unwrap();
        let outcome = lanes
            .dispatch(Delivery::new(
                "instance.update.done",
                br#"{"service_id":"svc-7","instance_name":"a"}"#.to_vec(),
            ))
            .await
            .unwrap();
        assert_eq!(intake, outcome);

        lanes.shutdown().await;

        assert_eq!(
            h.stored("svc-7", Action::Update).await.status,
            BatchStatus::Completed
        );
        assert_eq!(h.publisher.on("instances.update.done").len(), 1);
    }

    #[tokio::test]
    async fn failures_do_not_stop_a_lane() {
        let h = Harness::new();
        let lanes = Lanes::spawn(
            Arc::new(Coordinator::new(h.publisher(), h.store.clone())),
            1,
            4,
        );

        lanes
            .dispatch(Delivery::new(
                "instance.create.done",
                br#"{"service_id":"ghost","instance_name":"a"}"#.to_vec(),
            ))
            .await
            .unwrap();
        lanes
            .dispatch(Delivery::new("instances.create", b"garbage".to_vec()))
            .await
            .unwrap();
        let b = batch("svc", Action::Create, vec![]);
        lanes
            .dispatch(Delivery::new("instances.create", payload(&b)))
            .await
            .unwrap();

        lanes.shutdown().await;

        assert_eq!(h.publisher.sent().len(), 1);
        assert_eq!(h.publisher.on("instances.create.done").len(), 1);
    }
}
