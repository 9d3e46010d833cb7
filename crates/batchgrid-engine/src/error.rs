//! Engine error types.

use thiserror::Error;

use batchgrid_state::CacheKey;

/// Errors that can occur while handling a bus delivery.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("state error: {0}")]
    State(#[from] batchgrid_state::StateError),

    #[error("bus error: {0}")]
    Bus(#[from] batchgrid_bus::BusError),

    /// An outcome arrived for a batch with no persisted record.
    #[error("no batch record under {0}")]
    BatchNotFound(CacheKey),

    #[error("no route for subject: {0}")]
    Unroutable(String),

    #[error("lane {0} is closed")]
    LaneClosed(usize),
}

pub type EngineResult<T> = Result<T, EngineError>;
