use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Local id for a task created optimistically, before the server assigns one
    pub fn provisional() -> Self {
        TaskId(format!("{}{}", Self::PROVISIONAL_PREFIX, uuid::Uuid::new_v4()))
    }

    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(Self::PROVISIONAL_PREFIX)
    }

    const PROVISIONAL_PREFIX: &'static str = "local-";
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

/// The closed set of board columns, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Backlog,
    InProgress,
    Review,
    Done,
}

impl Column {
    pub const ALL: [Column; 4] = [
        Column::Backlog,
        Column::InProgress,
        Column::Review,
        Column::Done,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Column::Backlog => "backlog",
            Column::InProgress => "in_progress",
            Column::Review => "review",
            Column::Done => "done",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Column::Backlog => "Backlog",
            Column::InProgress => "In Progress",
            Column::Review => "Review",
            Column::Done => "Done",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Column {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|c| c.key() == s)
            .ok_or_else(|| DomainError::UnknownColumn(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        })
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(DomainError::UnknownPriority(other.to_string())),
        }
    }
}

/// Where a task sits on the board: its column and its dense index within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub column: Column,
    pub index: usize,
}

impl Placement {
    pub fn new(column: Column, index: usize) -> Self {
        Self { column, index }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.column, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub placement: Placement,
}

impl Task {
    pub fn column(&self) -> Column {
        self.placement.column
    }

    pub fn index(&self) -> usize {
        self.placement.index
    }

    /// Case-insensitive match against title and description
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&term) || self.description.to_lowercase().contains(&term)
    }

    /// Apply the non-positional fields of a patch
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(placement) = patch.placement {
            self.placement = placement;
        }
    }
}

/// A task that does not exist on the server yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub placement: Placement,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, column: Column) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            placement: Placement::new(column, 0),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            priority: self.priority,
            placement: self.placement,
        }
    }
}

/// Partial update of a task. Only `Some` fields are sent to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub placement: Option<Placement>,
}

impl TaskPatch {
    pub fn placement(placement: Placement) -> Self {
        Self {
            placement: Some(placement),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.placement.is_none()
    }

    pub fn touches_placement(&self) -> bool {
        self.placement.is_some()
    }
}
