use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use std::time::Duration;
use crate::ports::{BoardCache, BoardSnapshot};

/// Board fetches keyed by the API they came from, expiring after a TTL
pub struct MokaBoardCache {
    inner: MokaCache<String, BoardSnapshot>,
}

impl MokaBoardCache {
    pub fn new(ttl_seconds: u64, max_capacity: u64) -> Self {
        let cache = MokaCache::builder()
            .time_to_live(Duration::from_secs(ttl_seconds))
            .max_capacity(max_capacity)
            .build();

        Self { inner: cache }
    }

    pub fn with_default_settings() -> Self {
        Self::new(30, 16) // 30 seconds TTL, a handful of boards
    }
}

#[async_trait]
impl BoardCache for MokaBoardCache {
    async fn snapshot(&self, board: &str) -> Option<BoardSnapshot> {
        self.inner.get(board).await
    }

    async fn store(&self, board: &str, snapshot: BoardSnapshot) {
        self.inner.insert(board.to_string(), snapshot).await;
    }

    async fn invalidate(&self, board: &str) {
        self.inner.invalidate(board).await;
    }
}
