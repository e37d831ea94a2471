//! ActionName - ボードを変更する操作の名前（閉じた集合）
//!
//! 名前はリモートの履歴スナップショットにも保存されるため、
//! camelCase（`"addColumn"`, `"reorderTasks"` など）でシリアライズします。

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionName {
    AddColumn,
    UpdateColumn,
    DeleteColumn,
    AddTask,
    UpdateTask,
    DeleteTask,
    ReorderTasks,
    ReorderColumns,
    AddComment,
    UpdateComment,
    DeleteComment,
}

impl ActionName {
    pub const ALL: [ActionName; 11] = [
        ActionName::AddColumn,
        ActionName::UpdateColumn,
        ActionName::DeleteColumn,
        ActionName::AddTask,
        ActionName::UpdateTask,
        ActionName::DeleteTask,
        ActionName::ReorderTasks,
        ActionName::ReorderColumns,
        ActionName::AddComment,
        ActionName::UpdateComment,
        ActionName::DeleteComment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionName::AddColumn => "addColumn",
            ActionName::UpdateColumn => "updateColumn",
            ActionName::DeleteColumn => "deleteColumn",
            ActionName::AddTask => "addTask",
            ActionName::UpdateTask => "updateTask",
            ActionName::DeleteTask => "deleteTask",
            ActionName::ReorderTasks => "reorderTasks",
            ActionName::ReorderColumns => "reorderColumns",
            ActionName::AddComment => "addComment",
            ActionName::UpdateComment => "updateComment",
            ActionName::DeleteComment => "deleteComment",
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
