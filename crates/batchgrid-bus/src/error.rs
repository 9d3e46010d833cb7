//! Bus error types.

use thiserror::Error;

/// Errors raised by bus transports.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus connection failed: {0}")]
    Connect(#[from] redis::RedisError),

    #[error("nats connection failed: {0}")]
    NatsConnect(#[from] async_nats::ConnectError),

    #[error("subscribe to {subject} failed: {reason}")]
    Subscribe { subject: String, reason: String },

    #[error("publish to {subject} failed: {reason}")]
    Publish { subject: String, reason: String },

    #[error("message encoding failed: {0}")]
    Encode(#[from] batchgrid_state::StateError),
}

pub type BusResult<T> = Result<T, BusError>;
