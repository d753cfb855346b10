use crate::domain::{Column, Task, TaskId};

/// The local view of every task on the board.
///
/// Plain owned collection without validation; the coordinator is its only
/// writer and always swaps in a fully computed task set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    /// Tasks of one column, ascending by index
    pub fn by_column(&self, column: Column) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.column() == column)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.index());
        tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Deep copy for an exact restore later
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
