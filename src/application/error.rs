use crate::domain::DomainError;
use crate::ports::{ConfigError, RepositoryError};
use thiserror::Error;

use super::SyncError;

#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rejected: {0}")]
    Domain(#[from] DomainError),

    #[error("Changes were not saved and have been undone: {0}")]
    Sync(#[from] SyncError),
}

pub type AppResult<T> = Result<T, AppError>;
