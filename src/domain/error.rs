use thiserror::Error;

use super::{Column, TaskId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Unknown priority: {0}")]
    UnknownPriority(String),

    #[error("Task title must not be empty")]
    EmptyTitle,

    #[error("Column {column} holds indices {indices:?}, expected 0..{}", .indices.len())]
    InvariantViolation { column: Column, indices: Vec<usize> },

    #[error("Task {0} appears more than once")]
    DuplicateTask(TaskId),
}

pub type DomainResult<T> = Result<T, DomainError>;
