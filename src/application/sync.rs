use futures::future::{join_all, BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{DiffEntry, Task, TaskId, TaskPatch};
use crate::ports::{RepositoryError, RepositoryResult, TaskRepository};

use super::SyncPlan;

/// One remote call that did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub task_id: TaskId,
    pub error: RepositoryError,
}

/// Aggregate failure of an operation: at least one of its calls failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} of {} remote calls failed (first: {})", .failures.len(), .attempted, .failures[0].error)]
pub struct SyncError {
    pub attempted: usize,
    /// Never empty
    pub failures: Vec<CallFailure>,
}

impl SyncError {
    pub fn first_error(&self) -> &RepositoryError {
        &self.failures[0].error
    }

    pub fn failed_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.failures.iter().map(|f| &f.task_id)
    }
}

/// What the server returned for a fully successful operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReceipt {
    pub updated: Vec<Task>,
    pub created: Option<Task>,
}

type CallResult = Result<Option<Task>, CallFailure>;

/// Turns a sync plan into independent repository calls and folds their
/// outcomes into a single verdict.
///
/// Calls of one plan run concurrently and are all awaited before deciding,
/// so a failure never leaves a call unobserved. Nothing is retried.
pub struct RemoteSync {
    repository: Arc<dyn TaskRepository>,
    timeout: Duration,
}

impl RemoteSync {
    pub fn new(repository: Arc<dyn TaskRepository>, timeout: Duration) -> Self {
        Self {
            repository,
            timeout,
        }
    }

    pub async fn fetch_all(&self) -> RepositoryResult<Vec<Task>> {
        self.bounded(self.repository.list_tasks()).await
    }

    pub async fn persist(&self, plan: &SyncPlan) -> Result<SyncReceipt, SyncError> {
        let calls: Vec<BoxFuture<'_, CallResult>> = match plan {
            SyncPlan::Reposition { diff, .. } => diff.iter().map(|e| self.reposition(e)).collect(),
            SyncPlan::Create {
                provisional_id,
                draft,
            } => vec![async move {
                self.call(provisional_id, self.repository.create_task(draft))
                    .await
                    .map(Some)
            }
            .boxed()],
            SyncPlan::Edit { id, patch } => vec![async move {
                self.call(id, self.repository.update_task(id, patch))
                    .await
                    .map(Some)
            }
            .boxed()],
            SyncPlan::Delete { id, shifted } => {
                let delete = async move {
                    self.call(id, self.repository.delete_task(id))
                        .await
                        .map(|()| None)
                }
                .boxed();
                std::iter::once(delete)
                    .chain(shifted.iter().map(|e| self.reposition(e)))
                    .collect()
            }
        };

        let attempted = calls.len();
        tracing::debug!("Persisting {} with {} remote calls", plan.kind(), attempted);

        let mut receipt = SyncReceipt::default();
        let mut failures = Vec::new();
        for outcome in join_all(calls).await {
            match outcome {
                Ok(Some(task)) => receipt.updated.push(task),
                Ok(None) => {}
                Err(failure) => failures.push(failure),
            }
        }

        if !failures.is_empty() {
            return Err(SyncError {
                attempted,
                failures,
            });
        }

        if matches!(plan, SyncPlan::Create { .. }) {
            receipt.created = receipt.updated.pop();
        }
        Ok(receipt)
    }

    fn reposition<'a>(&'a self, entry: &'a DiffEntry) -> BoxFuture<'a, CallResult> {
        async move {
            let patch = TaskPatch::placement(entry.placement);
            self.call(&entry.task_id, self.repository.update_task(&entry.task_id, &patch))
                .await
                .map(Some)
        }
        .boxed()
    }

    async fn call<T, F>(&self, task_id: &TaskId, request: F) -> Result<T, CallFailure>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        self.bounded(request).await.map_err(|error| {
            tracing::warn!("Remote call for task {} failed: {}", task_id, error);
            CallFailure {
                task_id: task_id.clone(),
                error,
            }
        })
    }

    async fn bounded<T, F>(&self, request: F) -> RepositoryResult<T>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}
