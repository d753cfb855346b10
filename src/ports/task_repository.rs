use async_trait::async_trait;
use crate::domain::{Task, TaskDraft, TaskId, TaskPatch};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimit(u64),

    #[error("API error: {0}")]
    Api(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// The remote task service. Each call is atomic and independent of the others;
/// there is no batch or transaction endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn list_tasks(&self) -> RepositoryResult<Vec<Task>>;
    async fn create_task(&self, draft: &TaskDraft) -> RepositoryResult<Task>;
    /// Fails with `NotFound` if the id is unknown
    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> RepositoryResult<Task>;
    /// Fails with `NotFound` if the id is unknown
    async fn delete_task(&self, id: &TaskId) -> RepositoryResult<()>;
}
