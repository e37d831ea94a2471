//! Mutation - ボードを変更する操作（閉じた集合）
//!
//! `Mutation` は決定的に適用するための情報をすべて持ちます。
//! 新しく作るエンティティの ID もクライアント側（`app::client`）で発行して含めるため、
//! 同じボードに同じ Mutation を適用すれば常に同じ結果になります。

use serde::{Deserialize, Serialize};

use super::action::ActionName;
use super::board::Board;
use super::errors::{Field, ValidationError, require_non_blank};
use super::ids::{ColumnId, CommentId, SessionId, TaskId};

/// A drop position inside a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLocation {
    pub column_id: ColumnId,
    pub index: usize,
}

impl TaskLocation {
    pub fn new(column_id: ColumnId, index: usize) -> Self {
        Self { column_id, index }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    AddColumn {
        column_id: ColumnId,
        title: String,
    },
    UpdateColumn {
        column_id: ColumnId,
        title: String,
    },
    DeleteColumn {
        column_id: ColumnId,
    },
    AddTask {
        column_id: ColumnId,
        task_id: TaskId,
        title: String,
        description: String,
    },
    UpdateTask {
        task_id: TaskId,
        title: String,
        description: String,
    },
    DeleteTask {
        task_id: TaskId,
        column_id: ColumnId,
    },
    /// `task_id` is only used for the presence label; the move itself trusts `source.index`.
    ReorderTasks {
        source: TaskLocation,
        destination: TaskLocation,
        task_id: TaskId,
    },
    /// Indices are global positions in `column_order`.
    ReorderColumns {
        source: usize,
        destination: usize,
    },
    AddComment {
        task_id: TaskId,
        comment_id: CommentId,
        text: String,
        author: SessionId,
    },
    UpdateComment {
        task_id: TaskId,
        comment_id: CommentId,
        text: String,
    },
    DeleteComment {
        task_id: TaskId,
        comment_id: CommentId,
    },
}

impl Mutation {
    pub fn action(&self) -> ActionName {
        match self {
            Mutation::AddColumn { .. } => ActionName::AddColumn,
            Mutation::UpdateColumn { .. } => ActionName::UpdateColumn,
            Mutation::DeleteColumn { .. } => ActionName::DeleteColumn,
            Mutation::AddTask { .. } => ActionName::AddTask,
            Mutation::UpdateTask { .. } => ActionName::UpdateTask,
            Mutation::DeleteTask { .. } => ActionName::DeleteTask,
            Mutation::ReorderTasks { .. } => ActionName::ReorderTasks,
            Mutation::ReorderColumns { .. } => ActionName::ReorderColumns,
            Mutation::AddComment { .. } => ActionName::AddComment,
            Mutation::UpdateComment { .. } => ActionName::UpdateComment,
            Mutation::DeleteComment { .. } => ActionName::DeleteComment,
        }
    }

    /// Local input guard. Runs before anything is recorded or changed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Mutation::AddColumn { title, .. } | Mutation::UpdateColumn { title, .. } => {
                require_non_blank(title, Field::ColumnTitle)
            }
            Mutation::AddTask { title, .. } | Mutation::UpdateTask { title, .. } => {
                require_non_blank(title, Field::TaskTitle)
            }
            Mutation::AddComment { text, .. } | Mutation::UpdateComment { text, .. } => {
                require_non_blank(text, Field::CommentText)
            }
            _ => Ok(()),
        }
    }

    /// Human-readable "last action" shown next to the acting session.
    ///
    /// Reads the pre-mutation board, so a moved task is labelled by its current title.
    pub fn presence_label(&self, board: &Board) -> String {
        match self {
            Mutation::AddColumn { title, .. } => format!("Added column: {title}"),
            Mutation::UpdateColumn { title, .. } => format!("Editing column: {title}"),
            Mutation::DeleteColumn { .. } => "Deleted column".to_string(),
            Mutation::AddTask { title, .. } => format!("Added task: {title}"),
            Mutation::UpdateTask { title, .. } => format!("Editing task: {title}"),
            Mutation::DeleteTask { .. } => "Deleted task".to_string(),
            Mutation::ReorderTasks { task_id, .. } => {
                let title = board
                    .task(*task_id)
                    .map(|task| task.title.as_str())
                    .unwrap_or("Unknown");
                format!("Moving task: {title}")
            }
            Mutation::ReorderColumns { .. } => "Reordered column".to_string(),
            Mutation::AddComment { .. } => "Added comment to task".to_string(),
            Mutation::UpdateComment { .. } => "Edited comment".to_string(),
            Mutation::DeleteComment { .. } => "Deleted comment".to_string(),
        }
    }
}

/// One subtree touched by a mutation. The synchronizer maps each to remote key paths.
///
/// `*Created` writes the whole entity. `*Edited` and `ColumnTasks` write only the
/// listed fields, so concurrent writes to sibling fields (for example another
/// session's comments on the same task) survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    ColumnCreated(ColumnId),
    /// `title`
    ColumnEdited(ColumnId),
    /// `taskIds`
    ColumnTasks(ColumnId),
    ColumnRemoved(ColumnId),
    ColumnOrder,
    TaskCreated(TaskId),
    /// `title`, `description`, `updatedAt`
    TaskEdited(TaskId),
    TaskRemoved(TaskId),
    CommentCreated {
        task_id: TaskId,
        comment_id: CommentId,
    },
    /// `text`, `updatedAt`
    CommentEdited {
        task_id: TaskId,
        comment_id: CommentId,
    },
    CommentRemoved {
        task_id: TaskId,
        comment_id: CommentId,
    },
}

/// Result of a mutation applied to the local board.
///
/// `changes` is empty when the mutation targeted missing entities; the history
/// entry was still recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub action: ActionName,
    pub label: String,
    pub changes: Vec<Change>,
}

impl Applied {
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}
