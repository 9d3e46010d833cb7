//! Subscription loop feeding the lanes.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use batchgrid_bus::{DeliveryStream, Publisher, Subscriber};
use batchgrid_state::KvStore;

use crate::coordinator::Coordinator;
use crate::error::EngineResult;
use crate::lanes::Lanes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub lanes: usize,
    pub lane_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lanes: 8,
            lane_capacity: 256,
        }
    }
}

/// A running pipeline. Dropping it without [`Pipeline::shutdown`] leaves the
/// loop running until the subscription ends.
pub struct Pipeline {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Pipeline {
    /// Subscribe to every inbound subject and start dispatching.
    ///
    /// The subscription is live when this returns, so messages published
    /// afterwards are not missed.
    pub async fn start(
        subscriber: &dyn Subscriber,
        publisher: Arc<dyn Publisher>,
        store: Arc<dyn KvStore>,
        config: PipelineConfig,
    ) -> EngineResult<Self> {
        let subjects = Coordinator::subjects();
        let stream = subscriber.subscribe(&subjects).await?;

        let coordinator = Arc::new(Coordinator::new(publisher, store));
        let lanes = Lanes::spawn(coordinator, config.lanes, config.lane_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_pipeline(stream, lanes, shutdown_rx));

        info!(subjects = subjects.len(), lanes = config.lanes, "pipeline started");
        Ok(Self {
            shutdown_tx,
            handle,
        })
    }

    /// Stop consuming, then let the lanes finish what they already hold.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "pipeline task failed");
        }
        info!("pipeline stopped");
    }
}

async fn run_pipeline(mut stream: DeliveryStream, lanes: Lanes, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            next = stream.next() => match next {
                Some(delivery) => {
                    let subject = delivery.subject.clone();
                    if let Err(e) = lanes.dispatch(delivery).await {
                        warn!(%subject, error = %e, "delivery not dispatched");
                    }
                }
                None => {
                    warn!("subscription ended");
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }
    lanes.shutdown().await;
}
