use serde::{Deserialize, Serialize};
use crate::domain::*;

// Task servers hand out either numeric or string ids
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdDto {
    Text(String),
    Number(u64),
}

impl From<IdDto> for TaskId {
    fn from(id: IdDto) -> Self {
        match id {
            IdDto::Text(s) => TaskId(s),
            IdDto::Number(n) => TaskId(n.to_string()),
        }
    }
}

// DTOs for API communication
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskDto {
    pub id: IdDto,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// `[column, index]`
    pub column: (Column, usize),
    #[serde(default)]
    pub priority: Option<Priority>,
}

// Request DTOs
#[derive(Debug, Serialize)]
pub struct TaskCreateDto {
    pub title: String,
    pub description: String,
    pub column: (Column, usize),
    pub priority: Priority,
}

#[derive(Debug, Default, Serialize)]
pub struct TaskPatchDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<(Column, usize)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

// Conversion implementations
impl From<TaskDto> for Task {
    fn from(dto: TaskDto) -> Self {
        let (column, index) = dto.column;
        Self {
            id: dto.id.into(),
            title: dto.title,
            description: dto.description,
            priority: dto.priority.unwrap_or_default(),
            placement: Placement::new(column, index),
        }
    }
}

impl From<&TaskDraft> for TaskCreateDto {
    fn from(draft: &TaskDraft) -> Self {
        Self {
            title: draft.title.clone(),
            description: draft.description.clone(),
            column: (draft.placement.column, draft.placement.index),
            priority: draft.priority,
        }
    }
}

impl From<&TaskPatch> for TaskPatchDto {
    fn from(patch: &TaskPatch) -> Self {
        Self {
            title: patch.title.clone(),
            description: patch.description.clone(),
            column: patch.placement.map(|p| (p.column, p.index)),
            priority: patch.priority,
        }
    }
}
