use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

use crate::domain::*;
use crate::ports::{AppConfig, BoardCache, BoardSnapshot, TaskRepository};

use super::{
    AppError, AppResult, BoardEvent, OperationState, OperationToken, PendingOperation,
    RemoteSync, Settlement, SyncError, SyncPlan, SyncReceipt, TaskStore,
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct CoordinatorState {
    store: TaskStore,
    /// Highest token handed out so far
    issued: u64,
    /// The latest operation if it has been applied but not settled yet
    in_flight: Option<OperationToken>,
    /// Server ids of creates confirmed after a newer operation had already
    /// snapshotted their provisional id
    promoted: HashMap<TaskId, TaskId>,
}

impl CoordinatorState {
    fn issue(&mut self) -> OperationToken {
        self.issued += 1;
        let token = OperationToken(self.issued);
        if let Some(previous) = self.in_flight.replace(token) {
            tracing::debug!("{} supersedes {}", token, previous);
        }
        token
    }

    fn is_latest(&self, token: OperationToken) -> bool {
        token.0 == self.issued
    }

    /// Replace a provisional id with the server's id in the store
    fn promote(&mut self, provisional: &TaskId, created: TaskId) {
        let mut next = self.store.snapshot();
        if let Some(task) = next.iter_mut().find(|t| &t.id == provisional) {
            task.id = created.clone();
        }
        self.store.replace_all(next);
        self.promoted.insert(provisional.clone(), created);
    }

    /// A pre-apply snapshot with every promoted id swapped in
    fn restore(&mut self, mut snapshot: Vec<Task>) {
        for task in &mut snapshot {
            if let Some(created) = self.promoted.get(&task.id) {
                task.id = created.clone();
            }
        }
        self.store.replace_all(snapshot);
    }
}

/// Renumber server data that is not densely ordered
fn densify(tasks: Vec<Task>) -> Vec<Task> {
    match check_invariants(&tasks) {
        Ok(()) => tasks,
        Err(e) => {
            tracing::warn!("Server board is not densely ordered, renumbering: {}", e);
            normalize(&tasks)
        }
    }
}

/// Applies changes to the local store immediately, persists them in the
/// background and restores the pre-change snapshot if persistence fails.
///
/// Only the most recently started operation may touch the store when it
/// settles; older ones are discarded so a late rollback cannot clobber newer
/// optimistic state.
pub struct MutationCoordinator {
    board: String,
    state: RwLock<CoordinatorState>,
    sync: RemoteSync,
    cache: Arc<dyn BoardCache>,
    events: broadcast::Sender<BoardEvent>,
    reconcile_on_settle: bool,
}

impl MutationCoordinator {
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        cache: Arc<dyn BoardCache>,
        config: &AppConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            board: config.api_base_url.clone(),
            state: RwLock::new(CoordinatorState::default()),
            sync: RemoteSync::new(repository, Duration::from_secs(config.request_timeout_secs)),
            cache,
            events,
            reconcile_on_settle: config.reconcile_on_settle,
        }
    }

    /// Receive a notification after every load, apply, settle and reconcile
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: BoardEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// `Applied` while the latest operation awaits its settle, else `Idle`
    pub async fn status(&self) -> OperationState {
        match self.state.read().await.in_flight {
            Some(_) => OperationState::Applied,
            None => OperationState::Idle,
        }
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.store.snapshot()
    }

    pub async fn column(&self, column: Column) -> Vec<Task> {
        self.state.read().await.store.by_column(column)
    }

    pub async fn board(&self, search: Option<&str>) -> BoardView {
        BoardView::build(self.state.read().await.store.all(), search)
    }

    /// Populate the store from the server, or from the cached fetch if it is
    /// still fresh. Skipped while an operation is awaiting its settle.
    pub async fn load(&self, use_cache: bool) -> AppResult<Vec<Task>> {
        let cached = if use_cache {
            self.cache.snapshot(&self.board).await
        } else {
            None
        };

        let tasks = match cached {
            Some(snapshot) => {
                tracing::debug!("Using board fetched at {}", snapshot.fetched_at);
                snapshot.tasks
            }
            None => {
                let tasks = self.sync.fetch_all().await?;
                self.cache
                    .store(&self.board, BoardSnapshot::new(tasks.clone()))
                    .await;
                tasks
            }
        };

        let tasks = densify(tasks);

        let mut state = self.state.write().await;
        if let Some(token) = state.in_flight {
            tracing::debug!("Not replacing the store while {} is in flight", token);
            return Ok(state.store.snapshot());
        }
        state.store.replace_all(tasks.clone());
        drop(state);

        tracing::info!("Loaded {} tasks", tasks.len());
        self.emit(BoardEvent::Loaded { count: tasks.len() });
        Ok(tasks)
    }

    /// Apply a drag-and-drop move locally. Returns `None` when the move
    /// changes nothing, in which case the remote is not contacted.
    pub async fn apply_move(&self, request: MoveRequest) -> AppResult<Option<PendingOperation>> {
        let mut state = self.state.write().await;
        let snapshot = state.store.snapshot();

        let plan = plan_move(&snapshot, &request).map_err(|e| {
            tracing::warn!("Rejected move of {}: {}", request.task_id, e);
            e
        })?;
        if plan.is_noop() {
            tracing::debug!("Move of {} is a no-op", request.task_id);
            return Ok(None);
        }

        let token = state.issue();
        state.store.replace_all(plan.tasks);
        drop(state);

        tracing::info!(
            "{} moved {} to {} ({} tasks repositioned)",
            token,
            request.task_id,
            request.column,
            plan.diff.len()
        );
        Ok(Some(self.applied(
            token,
            SyncPlan::Reposition {
                request,
                diff: plan.diff,
            },
            snapshot,
        )))
    }

    /// Append a new task to the end of its column under a provisional id
    pub async fn apply_create(&self, mut draft: TaskDraft) -> AppResult<PendingOperation> {
        if draft.title.trim().is_empty() {
            return Err(DomainError::EmptyTitle.into());
        }

        let mut state = self.state.write().await;
        let snapshot = state.store.snapshot();

        draft.placement = append_slot(&snapshot, draft.placement.column);
        let provisional_id = TaskId::provisional();
        let mut next = snapshot.clone();
        next.push(draft.clone().into_task(provisional_id.clone()));

        let token = state.issue();
        state.store.replace_all(next);
        drop(state);

        tracing::info!("{} created {} at {}", token, provisional_id, draft.placement);
        Ok(self.applied(
            token,
            SyncPlan::Create {
                provisional_id,
                draft,
            },
            snapshot,
        ))
    }

    /// Change title, description or priority of one task. Placement changes
    /// must go through [`MutationCoordinator::apply_move`].
    pub async fn apply_edit(
        &self,
        id: &TaskId,
        patch: TaskPatch,
    ) -> AppResult<Option<PendingOperation>> {
        if patch.touches_placement() {
            return Err(DomainError::InvalidMove(
                "placement changes go through a move".to_string(),
            )
            .into());
        }
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(DomainError::EmptyTitle.into());
        }

        let mut state = self.state.write().await;
        if !state.store.contains(id) {
            return Err(DomainError::UnknownTask(id.clone()).into());
        }
        if patch.is_empty() {
            return Ok(None);
        }

        let snapshot = state.store.snapshot();
        let mut next = snapshot.clone();
        if let Some(task) = next.iter_mut().find(|t| &t.id == id) {
            task.apply(&patch);
        }

        let token = state.issue();
        state.store.replace_all(next);
        drop(state);

        tracing::info!("{} edited {}", token, id);
        Ok(Some(self.applied(
            token,
            SyncPlan::Edit {
                id: id.clone(),
                patch,
            },
            snapshot,
        )))
    }

    /// Remove a task and close the gap it leaves in its column
    pub async fn apply_delete(&self, id: &TaskId) -> AppResult<PendingOperation> {
        let mut state = self.state.write().await;
        let snapshot = state.store.snapshot();
        let plan = plan_removal(&snapshot, id)?;

        let token = state.issue();
        state.store.replace_all(plan.tasks);
        drop(state);

        tracing::info!(
            "{} deleted {} ({} tasks shifted)",
            token,
            id,
            plan.diff.len()
        );
        Ok(self.applied(
            token,
            SyncPlan::Delete {
                id: id.clone(),
                shifted: plan.diff,
            },
            snapshot,
        ))
    }

    fn applied(
        &self,
        token: OperationToken,
        plan: SyncPlan,
        snapshot: Vec<Task>,
    ) -> PendingOperation {
        self.emit(BoardEvent::Applied {
            token,
            kind: plan.kind(),
        });
        PendingOperation {
            token,
            plan,
            snapshot,
            applied_at: Utc::now(),
        }
    }

    /// Issue the remote calls for an applied operation
    pub async fn persist(&self, operation: &PendingOperation) -> Result<SyncReceipt, SyncError> {
        self.sync.persist(&operation.plan).await
    }

    /// Record the outcome of an operation.
    ///
    /// The latest operation either stays as applied (confirmed) or is undone
    /// by restoring its snapshot (rolled back). Any older operation is
    /// discarded without touching placements; a superseded create that
    /// succeeded still hands its server id to the provisional task.
    pub async fn settle(
        &self,
        operation: PendingOperation,
        outcome: Result<SyncReceipt, SyncError>,
    ) -> Settlement {
        let mut state = self.state.write().await;

        let (new_state, error) = if !state.is_latest(operation.token) {
            tracing::warn!(
                "Discarding settle of superseded {} ({})",
                operation.token,
                if outcome.is_ok() { "succeeded" } else { "failed" }
            );
            match outcome {
                Ok(receipt) => {
                    // Only the id changes, newer placements stay as they are.
                    if let (SyncPlan::Create { provisional_id, .. }, Some(created)) =
                        (&operation.plan, receipt.created)
                    {
                        state.promote(provisional_id, created.id);
                    }
                    (OperationState::Discarded, None)
                }
                Err(e) => (OperationState::Discarded, Some(e)),
            }
        } else {
            state.in_flight = None;
            let settled = match outcome {
                Ok(receipt) => {
                    if let (SyncPlan::Create { provisional_id, .. }, Some(created)) =
                        (&operation.plan, receipt.created)
                    {
                        state.promote(provisional_id, created.id);
                    }
                    tracing::info!("{} confirmed", operation.token);
                    (OperationState::Confirmed, None)
                }
                Err(e) => {
                    tracing::warn!("{} failed, rolling back: {}", operation.token, e);
                    state.restore(operation.snapshot);
                    (OperationState::RolledBack, Some(e))
                }
            };
            // No snapshot older than this one can be restored any more.
            state.promoted.clear();
            settled
        };
        drop(state);

        // The server may have changed even for a discarded operation.
        self.cache.invalidate(&self.board).await;

        let settlement = Settlement {
            token: operation.token,
            kind: operation.plan.kind(),
            state: new_state,
            error,
            settled_at: Utc::now(),
        };
        self.emit(BoardEvent::Settled(settlement.clone()));

        if new_state == OperationState::Confirmed && self.reconcile_on_settle {
            if let Err(e) = self.reconcile().await {
                tracing::warn!("Reconciliation after {} failed: {}", settlement.token, e);
            }
        }

        settlement
    }

    /// Replace the store with the server's view, unless an operation started
    /// or is still in flight. Returns whether the store was replaced.
    pub async fn reconcile(&self) -> AppResult<bool> {
        let issued_before = self.state.read().await.issued;
        let tasks = densify(self.sync.fetch_all().await?);

        let mut state = self.state.write().await;
        if state.issued != issued_before || state.in_flight.is_some() {
            tracing::debug!("Skipping reconciliation, the board changed meanwhile");
            return Ok(false);
        }
        state.store.replace_all(tasks.clone());
        drop(state);

        self.cache
            .store(&self.board, BoardSnapshot::new(tasks.clone()))
            .await;
        tracing::info!("Reconciled {} tasks with the server", tasks.len());
        self.emit(BoardEvent::Reconciled { count: tasks.len() });
        Ok(true)
    }

    async fn run(&self, operation: PendingOperation) -> AppResult<Settlement> {
        let outcome = self.persist(&operation).await;
        let settlement = self.settle(operation, outcome).await;
        match (&settlement.state, &settlement.error) {
            (OperationState::RolledBack, Some(e)) => Err(AppError::Sync(e.clone())),
            _ => Ok(settlement),
        }
    }

    /// Apply, persist and settle a move. `Ok(None)` for a no-op.
    pub async fn move_task(&self, request: MoveRequest) -> AppResult<Option<Settlement>> {
        match self.apply_move(request).await? {
            Some(operation) => self.run(operation).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn create_task(&self, draft: TaskDraft) -> AppResult<Settlement> {
        let operation = self.apply_create(draft).await?;
        self.run(operation).await
    }

    pub async fn edit_task(&self, id: &TaskId, patch: TaskPatch) -> AppResult<Option<Settlement>> {
        match self.apply_edit(id, patch).await? {
            Some(operation) => self.run(operation).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn delete_task(&self, id: &TaskId) -> AppResult<Settlement> {
        let operation = self.apply_delete(id).await?;
        self.run(operation).await
    }
}
