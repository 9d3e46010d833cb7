//! Publisher and subscriber seams.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;

use batchgrid_state::codec;

use crate::error::BusResult;

/// One message as seen on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub subject: String,
    pub payload: Vec<u8>,
}

impl Delivery {
    pub fn new(subject: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
        }
    }
}

/// Stream of deliveries for a set of subscribed subjects.
pub type DeliveryStream = BoxStream<'static, Delivery>;

/// Fire-and-forget publication onto a subject.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()>;
}

/// Subscription to a fixed set of subjects.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Subscribe to `subjects`. The subscription is live when this returns.
    async fn subscribe(&self, subjects: &[String]) -> BusResult<DeliveryStream>;
}

/// Encode `value` with the wire codec and publish it on `subject`.
pub async fn publish_json<T>(publisher: &dyn Publisher, subject: &str, value: &T) -> BusResult<()>
where
    T: Serialize + Sync,
{
    let payload = codec::encode(value)?;
    publisher.publish(subject, payload).await
}
