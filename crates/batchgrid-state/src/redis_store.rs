//! Redis-backed `KvStore`.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::{debug, info};

use crate::error::StateResult;
use crate::store::KvStore;

/// Shared Redis holding batch records as plain string values without TTL.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to Redis. `addr` may be a full `redis://` URL or a bare
    /// `host:port`.
    pub async fn connect(addr: &str) -> StateResult<Self> {
        let url = normalize_redis_url(addr);
        let client = redis::Client::open(url.as_str())?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(addr = %addr, "redis store connected");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> StateResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8]) -> StateResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value.to_vec()).await?;
        debug!(%key, bytes = value.len(), "batch record stored");
        Ok(())
    }
}

/// Prefix `redis://` onto addresses given as bare `host:port`.
pub fn normalize_redis_url(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("redis://{addr}")
    }
}
