//! NATS transport.
//!
//! Subjects are used verbatim as NATS subjects. One client carries both
//! publications and subscriptions; each subscribed subject gets its own
//! NATS subscription and the streams are merged.

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info};

use crate::error::{BusError, BusResult};
use crate::publisher::{Delivery, DeliveryStream, Publisher, Subscriber};

#[derive(Clone)]
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    /// Connect to a NATS server, e.g. `nats://localhost:4222`.
    pub async fn connect(url: &str) -> BusResult<Self> {
        let client = async_nats::connect(url).await?;
        info!("nats bus connected");
        Ok(Self { client })
    }
}

#[async_trait]
impl Publisher for NatsBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        let bytes = payload.len();
        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| BusError::Publish {
                subject: subject.to_string(),
                reason: e.to_string(),
            })?;
        debug!(%subject, bytes, "published");
        Ok(())
    }
}

#[async_trait]
impl Subscriber for NatsBus {
    async fn subscribe(&self, subjects: &[String]) -> BusResult<DeliveryStream> {
        let mut streams = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let subscription = self
                .client
                .subscribe(subject.clone())
                .await
                .map_err(|e| BusError::Subscribe {
                    subject: subject.clone(),
                    reason: e.to_string(),
                })?;
            streams.push(
                subscription
                    .map(|msg| Delivery::new(msg.subject.to_string(), msg.payload.to_vec()))
                    .boxed(),
            );
        }
        // Subscriptions are registered lazily; flush so they are live on return.
        self.client.flush().await.map_err(|e| BusError::Subscribe {
            subject: subjects.join(","),
            reason: e.to_string(),
        })?;
        info!(count = subjects.len(), "nats bus subscribed");

        Ok(futures::stream::select_all(streams).boxed())
    }
}
