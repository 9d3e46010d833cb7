//! In-process bus over a tokio broadcast channel.
//!
//! Every subscriber sees every publication made after it subscribed and
//! keeps only the subjects it asked for. Publications with no subscribers
//! are dropped, as on a real pub/sub bus.

use std::collections::HashSet;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::error::BusResult;
use crate::publisher::{Delivery, DeliveryStream, Publisher, Subscriber};

#[derive(Clone)]
pub struct MemoryBus {
    tx: broadcast::Sender<Delivery>,
}

impl MemoryBus {
    /// Create a bus whose subscribers can fall `capacity` messages behind
    /// before they start skipping.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl Publisher for MemoryBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        match self.tx.send(Delivery::new(subject, payload)) {
            Ok(receivers) => debug!(%subject, receivers, "published"),
            Err(_) => debug!(%subject, "no subscribers, message dropped"),
        }
        Ok(())
    }
}

#[async_trait]
impl Subscriber for MemoryBus {
    async fn subscribe(&self, subjects: &[String]) -> BusResult<DeliveryStream> {
        let rx = self.tx.subscribe();
        let wanted: HashSet<String> = subjects.iter().cloned().collect();

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(delivery) => return Some((delivery, rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "memory bus subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .filter(move |d| futures::future::ready(wanted.contains(&d.subject)))
        .boxed();

        Ok(stream)
    }
}
