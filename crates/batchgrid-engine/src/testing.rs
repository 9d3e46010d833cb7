//! Test doubles shared by the engine's unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use batchgrid_bus::{BusError, BusResult, Delivery, Publisher};
use batchgrid_state::{
    Action, BatchRepository, BatchRequest, Item, ItemStatus, KvStore, StateResult, StateStore,
};

/// Publisher that records every publication in order.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    sent: Arc<Mutex<Vec<Delivery>>>,
}

impl RecordingPublisher {
    pub fn sent(&self) -> Vec<Delivery> {
        self.sent.lock().unwrap().clone()
    }

    pub fn on(&self, subject: &str) -> Vec<Delivery> {
        self.sent()
            .into_iter()
            .filter(|d| d.subject == subject)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push(Delivery::new(subject, payload));
        Ok(())
    }
}

/// Publisher whose every publication fails.
pub struct FailingPublisher;

#[async_trait]
impl Publisher for FailingPublisher {
    async fn publish(&self, subject: &str, _payload: Vec<u8>) -> BusResult<()> {
        Err(BusError::Publish {
            subject: subject.to_string(),
            reason: "bus unavailable".to_string(),
        })
    }
}

/// Store wrapper counting writes.
pub struct CountingStore {
    inner: StateStore,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: StateStore) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for CountingStore {
    async fn get(&self, key: &str) -> StateResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> StateResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }
}

pub struct Harness {
    pub publisher: RecordingPublisher,
    pub store: Arc<CountingStore>,
    pub repository: BatchRepository,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(CountingStore::new(StateStore::open_in_memory().unwrap()));
        let repository = BatchRepository::new(store.clone());
        Self {
            publisher: RecordingPublisher::default(),
            store,
            repository,
        }
    }

    pub fn publisher(&self) -> Arc<dyn Publisher> {
        Arc::new(self.publisher.clone())
    }

    pub async fn stored(&self, service: &str, action: Action) -> BatchRequest {
        self.repository.load(service, action).await.unwrap().unwrap()
    }
}

pub fn item(name: &str) -> Item {
    Item {
        name: name.to_string(),
        network_name: "net-1".to_string(),
        cpus: 1,
        ram: 1024,
        ..Default::default()
    }
}

pub fn item_with_status(name: &str, status: ItemStatus) -> Item {
    Item {
        status,
        ..item(name)
    }
}

pub fn batch(service: &str, action: Action, items: Vec<Item>) -> BatchRequest {
    BatchRequest {
        service_id: service.to_string(),
        action,
        items,
        ..Default::default()
    }
}

pub fn payload(batch: &BatchRequest) -> Vec<u8> {
    serde_json::to_vec(batch).unwrap()
}

pub fn decode(delivery: &Delivery) -> serde_json::Value {
    serde_json::from_slice(&delivery.payload).unwrap()
}
