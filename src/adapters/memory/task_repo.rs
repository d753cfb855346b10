use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::domain::{Task, TaskDraft, TaskId, TaskPatch};
use crate::ports::{RepositoryError, RepositoryResult, TaskRepository};

/// Task service kept in process memory, with switches to make calls fail.
///
/// Stands in for the HTTP API in tests and offline runs.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: DashMap<TaskId, Task>,
    failing_updates: DashSet<TaskId>,
    offline: AtomicBool,
    list_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let repo = Self::new();
        for task in tasks {
            repo.tasks.insert(task.id.clone(), task);
        }
        repo
    }

    /// Make every update of this task fail with an API error
    pub fn fail_updates_for(&self, id: &TaskId) {
        self.failing_updates.insert(id.clone());
    }

    /// Make every call fail with a network error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Current contents ordered by column, then index
    pub fn snapshot(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.iter().map(|e| e.value().clone()).collect();
        tasks.sort_by(|a, b| {
            (a.column(), a.index(), &a.id).cmp(&(b.column(), b.index(), &b.id))
        });
        tasks
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> RepositoryResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Network("offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn list_tasks(&self) -> RepositoryResult<Vec<Task>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.snapshot())
    }

    async fn create_task(&self, draft: &TaskDraft) -> RepositoryResult<Task> {
        self.check_online()?;
        let task = draft
            .clone()
            .into_task(TaskId(uuid::Uuid::new_v4().to_string()));
        self.tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> RepositoryResult<Task> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if self.failing_updates.contains(id) {
            return Err(RepositoryError::Api(format!("HTTP 500: Couldn't update task {id}")));
        }

        let mut entry = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        entry.apply(patch);
        Ok(entry.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> RepositoryResult<()> {
        self.check_online()?;
        self.tasks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}
