//! Property tests: index density and conservation hold for any sequence of
//! moves, creates and deletes, both for the pure ordering functions and for
//! the coordinator with randomly failing persistence.

use std::sync::Arc;

use kanban_board::adapters::cache::MokaBoardCache;
use kanban_board::adapters::memory::InMemoryTaskRepository;
use kanban_board::application::{MutationCoordinator, OperationState};
use kanban_board::domain::*;
use kanban_board::ports::AppConfig;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Move { pick: usize, column: usize, index: usize },
    Create { column: usize },
    Delete { pick: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), 0..4usize, 0..8usize)
            .prop_map(|(pick, column, index)| Op::Move { pick, column, index }),
        2 => (0..4usize).prop_map(|column| Op::Create { column }),
        1 => any::<usize>().prop_map(|pick| Op::Delete { pick }),
    ]
}

fn counts(tasks: &[Task]) -> [usize; 4] {
    Column::ALL.map(|c| column_len(tasks, c))
}

proptest! {
    #[test]
    fn pure_ops_keep_columns_dense(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut tasks: Vec<Task> = Vec::new();
        let mut next_id = 0;

        for op in ops {
            match op {
                Op::Move { pick, column, index } => {
                    if tasks.is_empty() {
                        continue;
                    }
                    let dragged = tasks[pick % tasks.len()].clone();
                    let column = Column::ALL[column];
                    let before = counts(&tasks);

                    let plan = plan_move(&tasks, &MoveRequest::new(dragged.id.clone(), column, index)).unwrap();
                    let after = counts(&plan.tasks);

                    let src = Column::ALL.iter().position(|c| *c == dragged.column()).unwrap();
                    let dst = Column::ALL.iter().position(|c| *c == column).unwrap();
                    let mut expected = before;
                    if src != dst {
                        expected[src] -= 1;
                        expected[dst] += 1;
                    }
                    prop_assert_eq!(after, expected);
                    tasks = plan.tasks;
                }
                Op::Create { column } => {
                    let mut draft = TaskDraft::new(format!("t{next_id}"), Column::ALL[column]);
                    draft.placement = append_slot(&tasks, Column::ALL[column]);
                    tasks.push(draft.into_task(TaskId(format!("t{next_id}"))));
                    next_id += 1;
                }
                Op::Delete { pick } => {
                    if tasks.is_empty() {
                        continue;
                    }
                    let id = tasks[pick % tasks.len()].id.clone();
                    tasks = plan_removal(&tasks, &id).unwrap().tasks;
                }
            }
            prop_assert!(check_invariants(&tasks).is_ok(), "{:?}", check_invariants(&tasks));
        }
    }

    #[test]
    fn coordinator_stays_dense_and_rolls_back_exactly(
        steps in prop::collection::vec((arb_op(), any::<bool>()), 1..25)
    ) {
        tokio_test::block_on(async move {
            let repo = Arc::new(InMemoryTaskRepository::new());
            let config = AppConfig { reconcile_on_settle: false, ..Default::default() };
            let coordinator = MutationCoordinator::new(
                repo.clone(),
                Arc::new(MokaBoardCache::with_default_settings()),
                &config,
            );
            coordinator.load(false).await.unwrap();

            for (op, offline) in steps {
                let before = coordinator.tasks().await;
                repo.set_offline(offline);

                let pending = match op {
                    Op::Move { pick, column, index } if !before.is_empty() => {
                        let id = before[pick % before.len()].id.clone();
                        coordinator
                            .apply_move(MoveRequest::new(id, Column::ALL[column], index))
                            .await
                            .unwrap()
                    }
                    Op::Create { column } => Some(
                        coordinator
                            .apply_create(TaskDraft::new("new", Column::ALL[column]))
                            .await
                            .unwrap(),
                    ),
                    Op::Delete { pick } if !before.is_empty() => {
                        let id = before[pick % before.len()].id.clone();
                        Some(coordinator.apply_delete(&id).await.unwrap())
                    }
                    _ => None,
                };

                if let Some(operation) = pending {
                    check_invariants(&coordinator.tasks().await).unwrap();
                    let outcome = coordinator.persist(&operation).await;
                    let settlement = coordinator.settle(operation, outcome).await;

                    if offline {
                        assert_eq!(settlement.state, OperationState::RolledBack);
                        assert_eq!(coordinator.tasks().await, before);
                    } else {
                        assert_eq!(settlement.state, OperationState::Confirmed);
                    }
                }
                check_invariants(&coordinator.tasks().await).unwrap();
            }

            repo.set_offline(false);
            check_invariants(&repo.snapshot()).unwrap();
        });
    }
}
