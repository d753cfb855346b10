use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::domain::Task;

/// A full fetch of the board, remembered for a while so repeated loads
/// do not hit the server
#[derive(Debug, Clone)]
pub struct BoardSnapshot {
    pub tasks: Vec<Task>,
    pub fetched_at: DateTime<Utc>,
}

impl BoardSnapshot {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            fetched_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait BoardCache: Send + Sync {
    async fn snapshot(&self, board: &str) -> Option<BoardSnapshot>;
    async fn store(&self, board: &str, snapshot: BoardSnapshot);
    /// Drop the remembered fetch after the server state changed
    async fn invalidate(&self, board: &str);
}
