//! Redis pub/sub transport.
//!
//! Subjects map one-to-one onto Redis channels. Publication goes through a
//! shared multiplexed connection; each subscription opens its own pub/sub
//! connection.

use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::{debug, info};

use crate::error::{BusError, BusResult};
use crate::publisher::{Delivery, DeliveryStream, Publisher, Subscriber};

#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl RedisBus {
    pub async fn connect(url: &str) -> BusResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("redis bus connected");
        Ok(Self { client, conn })
    }
}

#[async_trait]
impl Publisher for RedisBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(subject, payload)
            .await
            .map_err(|e| BusError::Publish {
                subject: subject.to_string(),
                reason: e.to_string(),
            })?;
        debug!(%subject, receivers, "published");
        Ok(())
    }
}

#[async_trait]
impl Subscriber for RedisBus {
    async fn subscribe(&self, subjects: &[String]) -> BusResult<DeliveryStream> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        for subject in subjects {
            pubsub
                .subscribe(subject.as_str())
                .await
                .map_err(|e| BusError::Subscribe {
                    subject: subject.clone(),
                    reason: e.to_string(),
                })?;
        }
        info!(count = subjects.len(), "redis bus subscribed");

        let stream = pubsub
            .into_on_message()
            .map(|msg| Delivery::new(msg.get_channel_name(), msg.get_payload_bytes()))
            .boxed();
        Ok(stream)
    }
}
