use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::domain::{DiffEntry, MoveRequest, Task, TaskDraft, TaskId, TaskPatch};

use super::SyncError;

/// Monotonic identity of an optimistic operation. Only the highest issued
/// token may still change the store when it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OperationToken(pub u64);

impl fmt::Display for OperationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// `Idle → Applied → {Confirmed | RolledBack}`, or `Applied → Discarded`
/// once a newer operation has started, whatever the server said.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Idle,
    Applied,
    Confirmed,
    RolledBack,
    Discarded,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Confirmed | OperationState::RolledBack | OperationState::Discarded
        )
    }
}

/// The remote calls needed to make the server match an optimistic change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPlan {
    /// One placement patch per entry
    Reposition { request: MoveRequest, diff: Vec<DiffEntry> },
    Create { provisional_id: TaskId, draft: TaskDraft },
    Edit { id: TaskId, patch: TaskPatch },
    /// The delete call plus one placement patch per task that shifted up
    Delete { id: TaskId, shifted: Vec<DiffEntry> },
}

impl SyncPlan {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncPlan::Reposition { .. } => "move",
            SyncPlan::Create { .. } => "create",
            SyncPlan::Edit { .. } => "edit",
            SyncPlan::Delete { .. } => "delete",
        }
    }
}

/// An operation that has been applied locally and awaits its settle.
///
/// Holds the exact store contents from before the apply so a failure can be
/// undone in one step. Every applied operation must be passed to
/// [`MutationCoordinator::settle`](super::MutationCoordinator::settle): until
/// the latest one is, `load` and `reconcile` leave the store alone.
#[must_use = "an applied operation must be settled, or loads stay paused"]
#[derive(Debug, Clone)]
pub struct PendingOperation {
    pub token: OperationToken,
    pub plan: SyncPlan,
    pub(crate) snapshot: Vec<Task>,
    pub applied_at: DateTime<Utc>,
}

impl PendingOperation {
    pub fn snapshot(&self) -> &[Task] {
        &self.snapshot
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub token: OperationToken,
    pub kind: &'static str,
    pub state: OperationState,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "error_message")]
    pub error: Option<SyncError>,
    pub settled_at: DateTime<Utc>,
}

fn error_message<S: serde::Serializer>(
    error: &Option<SyncError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Notifications for presentation layers that derive views from the store
#[derive(Debug, Clone)]
pub enum BoardEvent {
    Loaded { count: usize },
    Applied { token: OperationToken, kind: &'static str },
    Settled(Settlement),
    Reconciled { count: usize },
}
