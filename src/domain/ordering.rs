//! Placement math for the board.
//!
//! Every function here is pure: it takes the current task set by reference,
//! computes the next one on a private copy and reports the net diff against
//! the input. Callers swap the result into the store in one step.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::error::{DomainError, DomainResult};
use super::task::{Column, Placement, Task, TaskId};

/// A drag-and-drop intent: put `task_id` into `column` at drop slot `index`.
///
/// `index` is the slot as the user saw it, counting the dragged card when it
/// is dropped back into its own column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub task_id: TaskId,
    pub column: Column,
    pub index: usize,
}

impl MoveRequest {
    pub fn new(task_id: impl Into<TaskId>, column: Column, index: usize) -> Self {
        Self {
            task_id: task_id.into(),
            column,
            index,
        }
    }
}

/// A task whose placement changed, and where it ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub task_id: TaskId,
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub tasks: Vec<Task>,
    pub diff: Vec<DiffEntry>,
}

impl MovePlan {
    fn unchanged(tasks: &[Task]) -> Self {
        Self {
            tasks: tasks.to_vec(),
            diff: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.diff.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalPlan {
    pub tasks: Vec<Task>,
    pub removed: Task,
    /// Tasks shifted up to close the gap
    pub diff: Vec<DiffEntry>,
}

/// Compute the board after moving one task.
///
/// Positions are taken from [`normalize`], so a column with gaps is ranked
/// by its stored order and the diff also carries the renumbered tasks.
/// Unknown tasks are rejected before anything is copied. A drop onto the
/// task's own slot (or onto the trailing slot when it is already last)
/// yields an empty diff and an identical task set.
pub fn plan_move(tasks: &[Task], request: &MoveRequest) -> DomainResult<MovePlan> {
    let ranked = normalize(tasks);
    let dragged = ranked
        .iter()
        .find(|t| t.id == request.task_id)
        .ok_or_else(|| DomainError::UnknownTask(request.task_id.clone()))?;

    let source = dragged.placement;
    let Some(target) = resolve_target(&ranked, source, request) else {
        return Ok(MovePlan::unchanged(tasks));
    };

    let mut next = ranked;

    // Compaction: close the gap left in the source column.
    for task in next.iter_mut().filter(|t| t.id != request.task_id) {
        if task.column() == source.column && task.index() > source.index {
            task.placement.index -= 1;
        }
    }

    // Insertion: open a slot in the destination column.
    for task in next.iter_mut().filter(|t| t.id != request.task_id) {
        if task.column() == target.column && task.index() >= target.index {
            task.placement.index += 1;
        }
    }

    if let Some(task) = next.iter_mut().find(|t| t.id == request.task_id) {
        task.placement = target;
    }

    let diff = diff(tasks, &next);
    Ok(MovePlan { tasks: next, diff })
}

/// Turn a drop slot into the post-removal placement, or `None` for a no-op.
fn resolve_target(tasks: &[Task], source: Placement, request: &MoveRequest) -> Option<Placement> {
    let column_len = column_len(tasks, request.column);
    let index = request.index.min(column_len);

    if request.column != source.column {
        return Some(Placement::new(request.column, index));
    }

    let already_last = source.index + 1 == column_len;
    if index == source.index || (index == column_len && already_last) {
        return None;
    }

    // Removing the dragged card shifts every later slot down by one.
    let index = if index > source.index { index - 1 } else { index };
    Some(Placement::new(request.column, index))
}

/// Compute the board after deleting one task, compacting its column.
pub fn plan_removal(tasks: &[Task], id: &TaskId) -> DomainResult<RemovalPlan> {
    let removed = tasks
        .iter()
        .find(|t| &t.id == id)
        .cloned()
        .ok_or_else(|| DomainError::UnknownTask(id.clone()))?;

    let ranked = normalize(tasks);
    let gap = ranked
        .iter()
        .find(|t| &t.id == id)
        .map(|t| t.placement)
        .unwrap_or(removed.placement);

    let mut next: Vec<Task> = ranked.into_iter().filter(|t| &t.id != id).collect();
    for task in &mut next {
        if task.column() == gap.column && task.index() > gap.index {
            task.placement.index -= 1;
        }
    }

    let remaining: Vec<Task> = tasks.iter().filter(|t| &t.id != id).cloned().collect();
    let diff = diff(&remaining, &next);
    Ok(RemovalPlan {
        tasks: next,
        removed,
        diff,
    })
}

/// Renumber every column to `0..n`, keeping the stored order within each
/// column. Equal indices are ordered by id. The vector order is preserved.
pub fn normalize(tasks: &[Task]) -> Vec<Task> {
    let mut order: Vec<usize> = (0..tasks.len()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (&tasks[a], &tasks[b]);
        (a.column(), a.index(), &a.id).cmp(&(b.column(), b.index(), &b.id))
    });

    let mut next = tasks.to_vec();
    let mut slots: BTreeMap<Column, usize> = BTreeMap::new();
    for position in order {
        let slot = slots.entry(tasks[position].column()).or_default();
        next[position].placement.index = *slot;
        *slot += 1;
    }
    next
}

/// The placement a newly created task takes: the end of its column.
pub fn append_slot(tasks: &[Task], column: Column) -> Placement {
    Placement::new(column, column_len(tasks, column))
}

pub fn column_len(tasks: &[Task], column: Column) -> usize {
    tasks.iter().filter(|t| t.column() == column).count()
}

/// Pairwise comparison of two task sets with the same ids in the same order.
fn diff(before: &[Task], after: &[Task]) -> Vec<DiffEntry> {
    before
        .iter()
        .zip(after)
        .filter(|(old, new)| old.placement != new.placement)
        .map(|(_, new)| DiffEntry {
            task_id: new.id.clone(),
            placement: new.placement,
        })
        .collect()
}

/// Verify that ids are unique and every column's indices are exactly `0..n`.
pub fn check_invariants(tasks: &[Task]) -> DomainResult<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(&task.id) {
            return Err(DomainError::DuplicateTask(task.id.clone()));
        }
    }

    let mut columns: BTreeMap<Column, Vec<usize>> = BTreeMap::new();
    for task in tasks {
        columns.entry(task.column()).or_default().push(task.index());
    }

    for (column, mut indices) in columns {
        indices.sort_unstable();
        if indices.iter().enumerate().any(|(expected, &actual)| expected != actual) {
            return Err(DomainError::InvariantViolation { column, indices });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, TaskDraft};

    fn task(id: &str, column: Column, index: usize) -> Task {
        Task {
            id: id.into(),
            title: id.to_uppercase(),
            description: String::new(),
            priority: Priority::Medium,
            placement: Placement::new(column, index),
        }
    }

    fn placement_of(tasks: &[Task], id: &str) -> Placement {
        tasks
            .iter()
            .find(|t| t.id.0 == id)
            .map(|t| t.placement)
            .unwrap()
    }

    fn order(tasks: &[Task], column: Column) -> Vec<String> {
        let mut in_column: Vec<&Task> = tasks.iter().filter(|t| t.column() == column).collect();
        in_column.sort_by_key(|t| t.index());
        in_column.iter().map(|t| t.id.0.clone()).collect()
    }

    fn backlog_abc() -> Vec<Task> {
        vec![
            task("a", Column::Backlog, 0),
            task("b", Column::Backlog, 1),
            task("c", Column::Backlog, 2),
        ]
    }

    #[test]
    fn test_move_last_to_front_of_same_column() {
        let tasks = backlog_abc();
        let plan = plan_move(&tasks, &MoveRequest::new("c", Column::Backlog, 0)).unwrap();

        assert_eq!(order(&plan.tasks, Column::Backlog), ["c", "a", "b"]);
        assert_eq!(plan.diff.len(), 3);
        check_invariants(&plan.tasks).unwrap();
    }

    #[test]
    fn test_move_across_columns() {
        let tasks = vec![
            task("a", Column::Backlog, 0),
            task("b", Column::Done, 0),
            task("c", Column::Done, 1),
        ];
        let plan = plan_move(&tasks, &MoveRequest::new("a", Column::Done, 1)).unwrap();

        assert!(order(&plan.tasks, Column::Backlog).is_empty());
        assert_eq!(order(&plan.tasks, Column::Done), ["b", "a", "c"]);
        assert_eq!(
            plan.diff,
            vec![
                DiffEntry {
                    task_id: "a".into(),
                    placement: Placement::new(Column::Done, 1)
                },
                DiffEntry {
                    task_id: "c".into(),
                    placement: Placement::new(Column::Done, 2)
                },
            ]
        );
    }

    #[test]
    fn test_target_beyond_column_length_appends() {
        let tasks = vec![
            task("a", Column::Backlog, 0),
            task("b", Column::Review, 0),
            task("c", Column::Review, 1),
        ];
        let plan = plan_move(&tasks, &MoveRequest::new("a", Column::Review, 5)).unwrap();

        assert_eq!(placement_of(&plan.tasks, "a"), Placement::new(Column::Review, 2));
        assert_eq!(plan.diff.len(), 1);
    }

    #[test]
    fn test_drop_on_own_slot_is_noop() {
        let tasks = backlog_abc();
        let plan = plan_move(&tasks, &MoveRequest::new("b", Column::Backlog, 1)).unwrap();

        assert!(plan.is_noop());
        assert_eq!(plan.tasks, tasks);
    }

    #[test]
    fn test_drop_after_last_when_already_last_is_noop() {
        let tasks = backlog_abc();
        let trailing = plan_move(&tasks, &MoveRequest::new("c", Column::Backlog, 3)).unwrap();
        let beyond = plan_move(&tasks, &MoveRequest::new("c", Column::Backlog, 9)).unwrap();

        assert!(trailing.is_noop());
        assert!(beyond.is_noop());
    }

    #[test]
    fn test_drop_just_below_itself_is_noop() {
        // Slot 2 sits between b and c; after removing b that is b's own slot.
        let tasks = backlog_abc();
        let plan = plan_move(&tasks, &MoveRequest::new("b", Column::Backlog, 2)).unwrap();

        assert!(plan.is_noop());
        assert_eq!(plan.tasks, tasks);
    }

    #[test]
    fn test_forward_move_compensates_for_removal() {
        let tasks = backlog_abc();

        let before_c = plan_move(&tasks, &MoveRequest::new("a", Column::Backlog, 2)).unwrap();
        assert_eq!(order(&before_c.tasks, Column::Backlog), ["b", "a", "c"]);

        let to_end = plan_move(&tasks, &MoveRequest::new("a", Column::Backlog, 3)).unwrap();
        assert_eq!(order(&to_end.tasks, Column::Backlog), ["b", "c", "a"]);
    }

    #[test]
    fn test_unknown_task_is_rejected() {
        let tasks = backlog_abc();
        let result = plan_move(&tasks, &MoveRequest::new("zzz", Column::Done, 0));

        assert_eq!(result, Err(DomainError::UnknownTask("zzz".into())));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let tasks = backlog_abc();
        let copy = tasks.clone();
        let _ = plan_move(&tasks, &MoveRequest::new("a", Column::Done, 0)).unwrap();

        assert_eq!(tasks, copy);
    }

    #[test]
    fn test_removal_compacts_column() {
        let mut tasks = backlog_abc();
        tasks.push(task("d", Column::Done, 0));
        let plan = plan_removal(&tasks, &"a".into()).unwrap();

        assert_eq!(plan.removed.id, TaskId::from("a"));
        assert_eq!(order(&plan.tasks, Column::Backlog), ["b", "c"]);
        assert_eq!(plan.diff.len(), 2);
        assert!(plan.diff.iter().all(|d| d.placement.column == Column::Backlog));
        check_invariants(&plan.tasks).unwrap();
    }

    #[test]
    fn test_removing_last_task_needs_no_shift() {
        let tasks = backlog_abc();
        let plan = plan_removal(&tasks, &"c".into()).unwrap();

        assert!(plan.diff.is_empty());
        assert_eq!(plan.tasks.len(), 2);
    }

    #[test]
    fn test_append_slot_is_column_length() {
        let tasks = backlog_abc();
        assert_eq!(append_slot(&tasks, Column::Backlog), Placement::new(Column::Backlog, 3));
        assert_eq!(append_slot(&tasks, Column::Done), Placement::new(Column::Done, 0));

        let draft = TaskDraft::new("x", Column::Done);
        assert_eq!(draft.placement.index, 0);
    }

    #[test]
    fn test_check_invariants_detects_gaps_and_duplicates() {
        let gap = vec![task("a", Column::Backlog, 0), task("b", Column::Backlog, 2)];
        assert!(matches!(
            check_invariants(&gap),
            Err(DomainError::InvariantViolation {
                column: Column::Backlog,
                ..
            })
        ));

        let dup_index = vec![task("a", Column::Done, 0), task("b", Column::Done, 0)];
        assert!(check_invariants(&dup_index).is_err());

        let dup_id = vec![task("a", Column::Done, 0), task("a", Column::Review, 0)];
        assert_eq!(
            check_invariants(&dup_id),
            Err(DomainError::DuplicateTask("a".into()))
        );
    }

    /// Every board with up to two tasks per column, every task, every
    /// destination and every drop slot (including out-of-range ones).
    #[test]
    fn test_normalize_closes_gaps_in_stored_order() {
        let tasks = vec![
            task("b", Column::Backlog, 5),
            task("a", Column::Backlog, 0),
            task("d", Column::Done, 3),
            task("c", Column::Done, 3),
        ];
        let dense = normalize(&tasks);

        assert_eq!(placement_of(&dense, "a"), Placement::new(Column::Backlog, 0));
        assert_eq!(placement_of(&dense, "b"), Placement::new(Column::Backlog, 1));
        assert_eq!(placement_of(&dense, "c"), Placement::new(Column::Done, 0));
        assert_eq!(placement_of(&dense, "d"), Placement::new(Column::Done, 1));
        let ids = |ts: &[Task]| ts.iter().map(|t| t.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&dense), ids(&tasks));
        assert_eq!(normalize(&backlog_abc()), backlog_abc());
    }

    #[test]
    fn test_move_on_gapped_column_uses_ranked_positions() {
        let tasks = vec![task("a", Column::Backlog, 0), task("b", Column::Backlog, 5)];
        let plan = plan_move(&tasks, &MoveRequest::new("a", Column::Backlog, 2)).unwrap();

        assert_eq!(order(&plan.tasks, Column::Backlog), ["b", "a"]);
        check_invariants(&plan.tasks).unwrap();

        let mut replayed = tasks.clone();
        for entry in &plan.diff {
            if let Some(t) = replayed.iter_mut().find(|t| t.id == entry.task_id) {
                t.placement = entry.placement;
            }
        }
        assert_eq!(replayed, plan.tasks);
    }

    #[test]
    fn test_removal_on_gapped_column_leaves_it_dense() {
        let tasks = vec![
            task("a", Column::Review, 1),
            task("b", Column::Review, 4),
            task("c", Column::Review, 9),
        ];
        let plan = plan_removal(&tasks, &"a".into()).unwrap();

        assert_eq!(plan.removed, tasks[0]);
        assert_eq!(order(&plan.tasks, Column::Review), ["b", "c"]);
        check_invariants(&plan.tasks).unwrap();
    }

    #[test]
    fn test_exhaustive_small_boards_keep_invariants() {
        let sizes = 0..=2usize;
        let mut boards_checked = 0;

        for b in sizes.clone() {
            for p in sizes.clone() {
                for r in sizes.clone() {
                    for d in sizes.clone() {
                        let board = build_board([b, p, r, d]);
                        boards_checked += 1;
                        check_every_move(&board);
                    }
                }
            }
        }

        assert_eq!(boards_checked, 81);
    }

    fn build_board(counts: [usize; 4]) -> Vec<Task> {
        let mut tasks = Vec::new();
        for (column, count) in Column::ALL.into_iter().zip(counts) {
            for index in 0..count {
                tasks.push(task(&format!("{}-{index}", column.key()), column, index));
            }
        }
        tasks
    }

    fn check_every_move(board: &[Task]) {
        for dragged in board {
            for column in Column::ALL {
                for index in 0..=column_len(board, column) + 2 {
                    let request = MoveRequest::new(dragged.id.clone(), column, index);
                    let plan = plan_move(board, &request).unwrap();

                    check_invariants(&plan.tasks)
                        .unwrap_or_else(|e| panic!("{request:?} broke the board: {e}"));
                    assert_eq!(plan.tasks.len(), board.len());

                    // Counts: unchanged for same-column moves, -1/+1 otherwise.
                    for c in Column::ALL {
                        let before = column_len(board, c) as isize;
                        let after = column_len(&plan.tasks, c) as isize;
                        let expected = if dragged.column() == column {
                            before
                        } else if c == dragged.column() {
                            before - 1
                        } else if c == column {
                            before + 1
                        } else {
                            before
                        };
                        assert_eq!(after, expected, "{request:?} count of {c}");
                    }

                    // The diff replayed on the input reproduces the plan.
                    let mut replayed = board.to_vec();
                    for entry in &plan.diff {
                        let t = replayed.iter_mut().find(|t| t.id == entry.task_id).unwrap();
                        t.placement = entry.placement;
                    }
                    assert_eq!(replayed, plan.tasks);

                    if plan.is_noop() {
                        assert_eq!(plan.tasks, board);
                        assert_eq!(column, dragged.column());
                    } else {
                        assert!(plan
                            .diff
                            .iter()
                            .any(|entry| entry.task_id == dragged.id));
                    }
                }
            }
        }
    }
}
