//! batchgrid-state: batch records and their persistence.
//!
//! Defines the provisioning batch data model, the JSON codec used on both
//! the message bus and the store, and the key-value persistence layer.
//!
//! # Architecture
//!
//! Records are stored as JSON under `GPBInstances_{service}_{action}`.
//! `BatchRepository` composes the key and runs the codec; the bytes go to
//! any `KvStore`: the embedded redb `StateStore` or the shared
//! `RedisStore`. Both are `Clone` + `Send` + `Sync` and can be shared
//! across async tasks.

pub mod codec;
pub mod error;
pub mod key;
pub mod redis_store;
pub mod repository;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use key::CacheKey;
pub use redis_store::RedisStore;
pub use repository::BatchRepository;
pub use store::{KvStore, StateStore};
pub use types::*;
