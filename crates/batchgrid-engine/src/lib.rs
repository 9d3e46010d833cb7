//! batchgrid-engine: batch coordination over a message bus.
//!
//! A batch request fans out into per-item work orders. Workers report back
//! one outcome per item, and the engine folds those into the persisted
//! batch record until every item is settled, then publishes exactly one
//! terminal event for the batch.
//!
//! # Architecture
//!
//! ```text
//! Subscriber ──► Pipeline ──► Lanes (by cache key) ──► Coordinator
//!                                                      ├─► IntakeService
//!                                                      └─► Aggregator
//!                                                            └─► Finalizer
//! ```
//!
//! Deliveries for the same (service, action) key always land in the same
//! lane, so read-modify-write on a batch record never interleaves.

pub mod aggregator;
pub mod coordinator;
pub mod error;
pub mod finalizer;
pub mod intake;
pub mod lanes;
pub mod lifecycle;
pub mod pipeline;

#[cfg(test)]
mod testing;

pub use aggregator::{AggregateOutcome, Aggregator};
pub use coordinator::{Coordinator, Handled};
pub use error::{EngineError, EngineResult};
pub use finalizer::{AGGREGATE_ERROR_CODE, AGGREGATE_ERROR_MESSAGE, Finalizer, VALIDATION_ERROR_CODE};
pub use intake::{IntakeOutcome, IntakeService};
pub use lanes::Lanes;
pub use lifecycle::{ItemInvalid, ItemLifecycle, Transition};
pub use pipeline::{Pipeline, PipelineConfig};
