use serde::Serialize;

use super::{Column, Task};

/// One column of the board as presented: label, count and ordered tasks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnView {
    pub column: Column,
    pub label: &'static str,
    pub count: usize,
    pub tasks: Vec<Task>,
}

/// Tasks grouped per column and sorted by index, optionally filtered by a
/// search term
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardView {
    pub total: usize,
    pub columns: Vec<ColumnView>,
}

impl BoardView {
    pub fn build(tasks: &[Task], search: Option<&str>) -> Self {
        let term = search.unwrap_or("");
        let visible: Vec<&Task> = tasks.iter().filter(|t| t.matches(term)).collect();

        let columns = Column::ALL
            .into_iter()
            .map(|column| {
                let mut in_column: Vec<Task> = visible
                    .iter()
                    .filter(|t| t.column() == column)
                    .map(|t| (*t).clone())
                    .collect();
                in_column.sort_by_key(|t| t.index());

                ColumnView {
                    column,
                    label: column.label(),
                    count: in_column.len(),
                    tasks: in_column,
                }
            })
            .collect();

        Self {
            total: visible.len(),
            columns,
        }
    }

    pub fn column(&self, column: Column) -> Option<&ColumnView> {
        self.columns.iter().find(|c| c.column == column)
    }
}
