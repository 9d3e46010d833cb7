//! Persistence adapter: batch records in and out of a `KvStore`.

use std::sync::Arc;

use tracing::debug;

use crate::codec;
use crate::error::StateResult;
use crate::key::CacheKey;
use crate::store::KvStore;
use crate::types::{Action, BatchRequest};

/// Loads and saves `BatchRequest` records under their composed cache key.
#[derive(Clone)]
pub struct BatchRepository {
    store: Arc<dyn KvStore>,
}

impl BatchRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Load the record for `(service_id, action)`.
    ///
    /// `Ok(None)` means no record exists; a record that fails to decode is
    /// an error, never an empty batch.
    pub async fn load(&self, service_id: &str, action: Action) -> StateResult<Option<BatchRequest>> {
        let key = CacheKey::compose(service_id, action);
        match self.store.get(key.as_str()).await? {
            Some(bytes) => codec::decode_batch(&bytes, action).map(Some),
            None => Ok(None),
        }
    }

    /// Persist `batch` under its own cache key, replacing any previous record.
    pub async fn save(&self, batch: &BatchRequest) -> StateResult<()> {
        let key = batch.cache_key();
        let bytes = codec::encode(batch)?;
        self.store.set(key.as_str(), &bytes).await?;
        debug!(%key, status = ?batch.status, "batch persisted");
        Ok(())
    }
}
