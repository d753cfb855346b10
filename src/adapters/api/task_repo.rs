use async_trait::async_trait;

use super::{BoardClient, TaskCreateDto, TaskDto, TaskPatchDto};
use crate::{
    domain::{Task, TaskDraft, TaskId, TaskPatch},
    ports::{RepositoryResult, TaskRepository},
};

/// `TaskRepository` backed by the `/tasks` REST resource
#[derive(Clone)]
pub struct HttpTaskRepository {
    client: BoardClient,
}

impl HttpTaskRepository {
    pub fn new(client: BoardClient) -> Self {
        Self { client }
    }

    fn task_path(id: &TaskId) -> String {
        format!("/tasks/{}", urlencoding::encode(&id.0))
    }
}

#[async_trait]
impl TaskRepository for HttpTaskRepository {
    async fn list_tasks(&self) -> RepositoryResult<Vec<Task>> {
        let task_dtos: Vec<TaskDto> = self.client.get("/tasks").await?;
        Ok(task_dtos.into_iter().map(|dto| dto.into()).collect())
    }

    async fn create_task(&self, draft: &TaskDraft) -> RepositoryResult<Task> {
        let create_dto = TaskCreateDto::from(draft);

        let task_dto: TaskDto = self.client.post("/tasks", &create_dto).await?;
        Ok(task_dto.into())
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> RepositoryResult<Task> {
        let patch_dto = TaskPatchDto::from(patch);

        let task_dto: TaskDto = self.client.patch(&Self::task_path(id), &patch_dto).await?;
        Ok(task_dto.into())
    }

    async fn delete_task(&self, id: &TaskId) -> RepositoryResult<()> {
        self.client.delete(&Self::task_path(id)).await
    }
}
