//! Events - ユーザーに通知する結果
//!
//! リモート書き込みの成功/失敗、入力の拒否、undo/redo の空振りを
//! `Notice` として EventSink に流します。表示はプレゼンテーション層の責務。

use std::fmt;

use super::action::ActionName;

/// 通知の対象となった操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Mutation(ActionName),
    Undo,
    Redo,
}

impl Operation {
    /// "Task added", "Action undone", ...
    fn done(self) -> &'static str {
        match self {
            Operation::Mutation(action) => match action {
                ActionName::AddColumn => "Column added",
                ActionName::UpdateColumn => "Column updated",
                ActionName::DeleteColumn => "Column deleted",
                ActionName::AddTask => "Task added",
                ActionName::UpdateTask => "Task updated",
                ActionName::DeleteTask => "Task deleted",
                ActionName::ReorderTasks => "Task moved",
                ActionName::ReorderColumns => "Column reordered",
                ActionName::AddComment => "Comment added",
                ActionName::UpdateComment => "Comment updated",
                ActionName::DeleteComment => "Comment deleted",
            },
            Operation::Undo => "Action undone",
            Operation::Redo => "Action redone",
        }
    }

    /// "add task", "undo action", ...
    fn attempted(self) -> &'static str {
        match self {
            Operation::Mutation(action) => match action {
                ActionName::AddColumn => "add column",
                ActionName::UpdateColumn => "update column",
                ActionName::DeleteColumn => "delete column",
                ActionName::AddTask => "add task",
                ActionName::UpdateTask => "update task",
                ActionName::DeleteTask => "delete task",
                ActionName::ReorderTasks => "move task",
                ActionName::ReorderColumns => "reorder column",
                ActionName::AddComment => "add comment",
                ActionName::UpdateComment => "update comment",
                ActionName::DeleteComment => "delete comment",
            },
            Operation::Undo => "undo action",
            Operation::Redo => "redo action",
        }
    }
}

/// Notice はユーザーに見せる結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// リモートへの書き込みが完了した
    Synced(Operation),
    /// リモートへの書き込みが失敗した（ローカルは変更済み）
    SyncFailed { operation: Operation, error: String },
    /// 入力検証で拒否された（何も変更していない）
    Rejected(String),
    NothingToUndo,
    NothingToRedo,
}

impl Notice {
    pub fn is_failure(&self) -> bool {
        matches!(self, Notice::SyncFailed { .. } | Notice::Rejected(_))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Synced(operation) => write!(f, "{} successfully!", operation.done()),
            Notice::SyncFailed { operation, .. } => write!(f, "Failed to {}.", operation.attempted()),
            Notice::Rejected(reason) => f.write_str(reason),
            Notice::NothingToUndo => f.write_str("No actions to undo."),
            Notice::NothingToRedo => f.write_str("No actions to redo."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_read_like_user_notices() {
        let ok = Notice::Synced(Operation::Mutation(ActionName::AddTask));
        assert_eq!(ok.to_string(), "Task added successfully!");

        let failed = Notice::SyncFailed {
            operation: Operation::Undo,
            error: "offline".into(),
        };
        assert_eq!(failed.to_string(), "Failed to undo action.");
        assert!(failed.is_failure());

        assert_eq!(Notice::NothingToRedo.to_string(), "No actions to redo.");
        assert!(!Notice::NothingToRedo.is_failure());
    }
}
