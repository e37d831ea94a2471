//! BoardState - ミューテーションの適用と Undo 履歴
//!
//! # 各 [`Mutation`] の処理順
//! 1. 入力検証（拒否した場合、ボードも履歴も変更しない）
//! 2. 現在のボードのスナップショットを `history.past` に積む
//! 3. `history.future` を空にする
//! 4. その場で変更を適用し、変更したサブツリーを返す
//!
//! リモートへの反映は同期処理（`app::sync`）の担当です。
//! Undo/Redo とリモートからの置き換えは手順 1-3 を通りません。

use chrono::{DateTime, Utc};

use super::action::ActionName;
use super::board::{Board, Column, Comment, Task};
use super::errors::ValidationError;
use super::history::History;
use super::mutation::{Applied, Change, Mutation, TaskLocation};
use super::ids::TaskId;

/// Local mirror of the shared board plus its undo history.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    board: Board,
    history: History,
    history_limit: Option<usize>,
}

impl BoardState {
    pub fn new(history_limit: Option<usize>) -> Self {
        Self {
            board: Board::new(),
            history: History::new(),
            history_limit,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Validate, record, and apply one mutation.
    pub fn apply(
        &mut self,
        mutation: Mutation,
        now: DateTime<Utc>,
    ) -> Result<Applied, ValidationError> {
        mutation.validate()?;

        let action = mutation.action();
        let label = mutation.presence_label(&self.board);
        self.history.record(&self.board, action, self.history_limit);
        let changes = apply_mutation(&mut self.board, mutation, now);

        Ok(Applied {
            action,
            label,
            changes,
        })
    }

    /// Returns the undone action, or `None` if there is nothing to undo.
    pub fn undo(&mut self) -> Option<ActionName> {
        self.history.undo(&mut self.board)
    }

    /// Returns the redone action, or `None` if there is nothing to redo.
    pub fn redo(&mut self) -> Option<ActionName> {
        self.history.redo(&mut self.board)
    }

    /// Replace the local board with a remote snapshot (last write wins, no merge).
    pub fn replace_board(&mut self, board: Board) {
        self.board = board;
    }

    /// Replace the local history with a remote snapshot.
    pub fn replace_history(&mut self, history: History) {
        self.history = history;
    }
}

fn apply_mutation(board: &mut Board, mutation: Mutation, now: DateTime<Utc>) -> Vec<Change> {
    match mutation {
        Mutation::AddColumn { column_id, title } => {
            board.columns.insert(column_id, Column::new(column_id, title));
            board.column_order.push(column_id);
            vec![Change::ColumnCreated(column_id), Change::ColumnOrder]
        }
        Mutation::UpdateColumn { column_id, title } => match board.columns.get_mut(&column_id) {
            Some(column) => {
                column.title = title;
                vec![Change::ColumnEdited(column_id)]
            }
            None => Vec::new(),
        },
        Mutation::DeleteColumn { column_id } => {
            let mut changes = Vec::new();
            let before = board.column_order.len();
            board.column_order.retain(|id| *id != column_id);
            let order_changed = board.column_order.len() != before;

            if let Some(column) = board.columns.remove(&column_id) {
                for task_id in column.task_ids {
                    if board.tasks.remove(&task_id).is_some() {
                        changes.push(Change::TaskRemoved(task_id));
                    }
                }
                changes.push(Change::ColumnRemoved(column_id));
            }
            if order_changed {
                changes.push(Change::ColumnOrder);
            }
            changes
        }
        Mutation::AddTask {
            column_id,
            task_id,
            title,
            description,
        } => match board.columns.get_mut(&column_id) {
            Some(column) => {
                column.task_ids.push(task_id);
                board
                    .tasks
                    .insert(task_id, Task::new(task_id, title, description, now));
                vec![Change::TaskCreated(task_id), Change::ColumnTasks(column_id)]
            }
            None => Vec::new(),
        },
        Mutation::UpdateTask {
            task_id,
            title,
            description,
        } => match board.tasks.get_mut(&task_id) {
            Some(task) => {
                task.title = title;
                task.description = description;
                task.updated_at = now;
                vec![Change::TaskEdited(task_id)]
            }
            None => Vec::new(),
        },
        Mutation::DeleteTask { task_id, column_id } => {
            if board.tasks.remove(&task_id).is_none() {
                return Vec::new();
            }
            // The caller's column is a hint; unlink from whichever column owns the task.
            let owner = if board
                .column(column_id)
                .is_some_and(|column| column.task_ids.contains(&task_id))
            {
                Some(column_id)
            } else {
                board.column_of(task_id)
            };
            let mut changes = vec![Change::TaskRemoved(task_id)];
            if let Some(owner) = owner
                && let Some(column) = board.columns.get_mut(&owner)
            {
                column.task_ids.retain(|id| *id != task_id);
                changes.push(Change::ColumnTasks(owner));
            }
            changes
        }
        Mutation::ReorderTasks {
            source,
            destination,
            task_id,
        } => reorder_tasks(board, source, destination, task_id),
        Mutation::ReorderColumns {
            source,
            destination,
        } => {
            if move_within(&mut board.column_order, source, destination) {
                vec![Change::ColumnOrder]
            } else {
                Vec::new()
            }
        }
        Mutation::AddComment {
            task_id,
            comment_id,
            text,
            author,
        } => match board.tasks.get_mut(&task_id) {
            Some(task) => {
                task.comments.insert(
                    comment_id,
                    Comment {
                        id: comment_id,
                        text,
                        created_at: now,
                        updated_at: None,
                        user_id: author,
                    },
                );
                vec![Change::CommentCreated {
                    task_id,
                    comment_id,
                }]
            }
            None => Vec::new(),
        },
        Mutation::UpdateComment {
            task_id,
            comment_id,
            text,
        } => match board
            .tasks
            .get_mut(&task_id)
            .and_then(|task| task.comments.get_mut(&comment_id))
        {
            Some(comment) => {
                comment.text = text;
                comment.updated_at = Some(now);
                vec![Change::CommentEdited {
                    task_id,
                    comment_id,
                }]
            }
            None => Vec::new(),
        },
        Mutation::DeleteComment {
            task_id,
            comment_id,
        } => match board
            .tasks
            .get_mut(&task_id)
            .and_then(|task| task.comments.remove(&comment_id))
        {
            Some(_) => vec![Change::CommentRemoved {
                task_id,
                comment_id,
            }],
            None => Vec::new(),
        },
    }
}

fn reorder_tasks(
    board: &mut Board,
    source: TaskLocation,
    destination: TaskLocation,
    task_id: TaskId,
) -> Vec<Change> {
    if !board.columns.contains_key(&destination.column_id) {
        return Vec::new();
    }
    let Some(source_column) = board.columns.get_mut(&source.column_id) else {
        return Vec::new();
    };

    if source.column_id == destination.column_id {
        warn_on_mismatch(&source_column.task_ids, source.index, task_id);
        return if move_within(&mut source_column.task_ids, source.index, destination.index) {
            vec![Change::ColumnTasks(source.column_id)]
        } else {
            Vec::new()
        };
    }

    if source.index >= source_column.task_ids.len() {
        return Vec::new();
    }
    warn_on_mismatch(&source_column.task_ids, source.index, task_id);
    let moved = source_column.task_ids.remove(source.index);

    if let Some(destination_column) = board.columns.get_mut(&destination.column_id) {
        let index = destination.index.min(destination_column.task_ids.len());
        destination_column.task_ids.insert(index, moved);
    }
    vec![
        Change::ColumnTasks(source.column_id),
        Change::ColumnTasks(destination.column_id),
    ]
}

/// Remove the item at `from` and reinsert it at `to`, where `to` indexes the
/// sequence after removal and is clamped to its length.
///
/// Returns `false` (sequence untouched) when `from` is out of range.
fn move_within<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() {
        return false;
    }
    let moved = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, moved);
    true
}

fn warn_on_mismatch(task_ids: &[TaskId], index: usize, expected: TaskId) {
    if let Some(found) = task_ids.get(index)
        && *found != expected
    {
        tracing::warn!(
            %expected,
            %found,
            index,
            "reorderTasks: dragged task id differs from the task at the source index; moving by index"
        );
    }
}
