//! Board - カラム・タスク・コメントと並び順のデータモデル
//!
//! 単なるデータの入れ物です。変更はすべて
//! [`crate::domain::engine::BoardState`] を経由します。
//! 同期処理が `Board` をいつでも丸ごと置き換えるため、部分への参照を保持しないこと。
//!
//! フィールド名はリモートのツリー構造に合わせて camelCase
//! （`board/columns/{id}`, `board/columnOrder`, `board/tasks/{id}`）。

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ColumnId, CommentId, SessionId, TaskId};

/// A comment attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub user_id: SessionId,
}

/// A task card. Owned by exactly one column through that column's `task_ids`.
///
/// `comments` is keyed by ULID, so iteration order is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub comments: BTreeMap<CommentId, Comment>,
}

impl Task {
    pub fn new(id: TaskId, title: String, description: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            description,
            created_at: now,
            updated_at: now,
            comments: BTreeMap::new(),
        }
    }

    /// Comments in insertion order.
    pub fn comments_in_order(&self) -> impl Iterator<Item = &Comment> {
        self.comments.values()
    }
}

/// A board column holding an ordered list of task ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    /// The remote store drops empty arrays, so a missing field means "no tasks".
    #[serde(default)]
    pub task_ids: Vec<TaskId>,
}

impl Column {
    pub fn new(id: ColumnId, title: String) -> Self {
        Self {
            id,
            title,
            task_ids: Vec::new(),
        }
    }
}

/// The full shared kanban state.
///
/// Invariants (see [`Board::check_invariants`]):
/// - `column_order` is a duplicate-free permutation of `keys(columns)`
/// - every id in every `task_ids` is a key of `tasks`, and appears in only one column
/// - every task is referenced by some column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    #[serde(default)]
    pub columns: BTreeMap<ColumnId, Column>,
    #[serde(default)]
    pub column_order: Vec<ColumnId>,
    #[serde(default)]
    pub tasks: BTreeMap<TaskId, Task>,
}

/// A broken board invariant. Only produced by [`Board::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("column {0} appears more than once in columnOrder")]
    DuplicateInColumnOrder(ColumnId),

    #[error("columnOrder references unknown column {0}")]
    UnknownColumnInOrder(ColumnId),

    #[error("column {0} is missing from columnOrder")]
    ColumnNotOrdered(ColumnId),

    #[error("column {column} references unknown task {task}")]
    DanglingTask { column: ColumnId, task: TaskId },

    #[error("task {0} is referenced by more than one column slot")]
    TaskReferencedTwice(TaskId),

    #[error("task {0} is not owned by any column")]
    OrphanTask(TaskId),
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.column_order.is_empty() && self.tasks.is_empty()
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(&id)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Columns in display order. Ids in `column_order` without a column entry are skipped.
    pub fn ordered_columns(&self) -> impl Iterator<Item = &Column> {
        self.column_order
            .iter()
            .filter_map(|id| self.columns.get(id))
    }

    /// The column whose `task_ids` contains `task_id`.
    pub fn column_of(&self, task_id: TaskId) -> Option<ColumnId> {
        self.columns
            .values()
            .find(|column| column.task_ids.contains(&task_id))
            .map(|column| column.id)
    }

    pub fn comment_count(&self) -> usize {
        self.tasks.values().map(|task| task.comments.len()).sum()
    }

    /// Returns the first violated invariant, if any.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen_columns = HashSet::new();
        for id in &self.column_order {
            if !seen_columns.insert(*id) {
                return Err(InvariantViolation::DuplicateInColumnOrder(*id));
            }
            if !self.columns.contains_key(id) {
                return Err(InvariantViolation::UnknownColumnInOrder(*id));
            }
        }
        if let Some(id) = self.columns.keys().find(|id| !seen_columns.contains(*id)) {
            return Err(InvariantViolation::ColumnNotOrdered(*id));
        }

        let mut owners: HashMap<TaskId, ColumnId> = HashMap::new();
        for column in self.columns.values() {
            for task in &column.task_ids {
                if !self.tasks.contains_key(task) {
                    return Err(InvariantViolation::DanglingTask {
                        column: column.id,
                        task: *task,
                    });
                }
                if owners.insert(*task, column.id).is_some() {
                    return Err(InvariantViolation::TaskReferencedTwice(*task));
                }
            }
        }
        if let Some(id) = self.tasks.keys().find(|id| !owners.contains_key(*id)) {
            return Err(InvariantViolation::OrphanTask(*id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn column_id() -> ColumnId {
        ColumnId::from_ulid(Ulid::new())
    }

    fn task_id() -> TaskId {
        TaskId::from_ulid(Ulid::new())
    }

    #[test]
    fn empty_board_is_consistent() {
        let board = Board::new();
        assert!(board.is_empty());
        assert_eq!(board.check_invariants(), Ok(()));
    }

    #[test]
    fn detects_duplicate_column_order() {
        let id = column_id();
        let mut board = Board::new();
        board.columns.insert(id, Column::new(id, "To Do".into()));
        board.column_order = vec![id, id];

        assert_eq!(
            board.check_invariants(),
            Err(InvariantViolation::DuplicateInColumnOrder(id))
        );
    }

    #[test]
    fn detects_dangling_and_orphan_tasks() {
        let col = column_id();
        let dangling = task_id();
        let mut board = Board::new();
        let mut column = Column::new(col, "To Do".into());
        column.task_ids.push(dangling);
        board.columns.insert(col, column);
        board.column_order.push(col);
        assert_eq!(
            board.check_invariants(),
            Err(InvariantViolation::DanglingTask {
                column: col,
                task: dangling
            })
        );

        board.columns.get_mut(&col).unwrap().task_ids.clear();
        let orphan = task_id();
        board
            .tasks
            .insert(orphan, Task::new(orphan, "lost".into(), String::new(), Utc::now()));
        assert_eq!(
            board.check_invariants(),
            Err(InvariantViolation::OrphanTask(orphan))
        );
    }

    #[test]
    fn remote_payload_with_missing_fields_decodes_as_empty() {
        // The remote store omits empty arrays and maps entirely.
        let col = column_id();
        let payload = serde_json::json!({
            "columns": { (col.key()): { "id": col.key(), "title": "Done" } },
            "columnOrder": [col.key()],
            "history": { "past": [] }
        });

        let board: Board = serde_json::from_value(payload).unwrap();
        assert!(board.tasks.is_empty());
        assert!(board.column(col).unwrap().task_ids.is_empty());
        assert_eq!(board.check_invariants(), Ok(()));
    }

    #[test]
    fn task_serializes_in_camel_case_without_empty_comments() {
        let id = task_id();
        let task = Task::new(id, "Write docs".into(), String::new(), Utc::now());
        let value = serde_json::to_value(&task).unwrap();

        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("comments").is_none());
    }
}
