//! batchgrid-bus: message bus plumbing for batch coordination.
//!
//! # Components
//!
//! - **`topic`**: the subject layout and inbound route classification
//! - **`publisher`**: `Publisher` / `Subscriber` seams and `Delivery`
//! - **`memory`**: in-process broadcast bus (tests, single-process use)
//! - **`nats_bus`**: NATS transport
//! - **`redis_bus`**: Redis pub/sub transport

pub mod error;
pub mod memory;
pub mod nats_bus;
pub mod publisher;
pub mod redis_bus;
pub mod topic;

pub use error::{BusError, BusResult};
pub use memory::MemoryBus;
pub use nats_bus::NatsBus;
pub use publisher::{Delivery, DeliveryStream, Publisher, Subscriber, publish_json};
pub use redis_bus::RedisBus;
pub use topic::{OutcomeStatus, Route};
