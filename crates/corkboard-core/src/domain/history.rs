//! History - ボード全体のスナップショットを積む 2 本のスタック
//!
//! # 状態遷移
//! - record: 変更前のスナップショットを `past` に積み、`future` を空にする
//! - undo:   `past` から取り出し、現在のボードを `future` に積んで復元
//! - redo:   `future` から取り出し、現在のボードを `past` に積んで復元
//!
//! 履歴は一直線です。Undo の後に記録すると Redo 側は捨てられます。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::action::ActionName;
use super::board::{Board, Column, Task};
use super::ids::{ColumnId, TaskId};

/// A deep copy of the board tagged with the action that was about to be applied.
///
/// Built with `Clone` on the owned entity types, so any field added to
/// `Task`, `Column` or `Comment` is carried by the snapshot automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    #[serde(default)]
    pub columns: BTreeMap<ColumnId, Column>,
    #[serde(default)]
    pub column_order: Vec<ColumnId>,
    #[serde(default)]
    pub tasks: BTreeMap<TaskId, Task>,
    pub action: ActionName,
}

impl HistorySnapshot {
    pub fn capture(board: &Board, action: ActionName) -> Self {
        Self {
            columns: board.columns.clone(),
            column_order: board.column_order.clone(),
            tasks: board.tasks.clone(),
            action,
        }
    }

    pub fn into_board(self) -> Board {
        Board {
            columns: self.columns,
            column_order: self.column_order,
            tasks: self.tasks,
        }
    }
}

/// Undo (`past`) and redo (`future`) stacks, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    #[serde(default)]
    pub past: Vec<HistorySnapshot>,
    #[serde(default)]
    pub future: Vec<HistorySnapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Record the pre-mutation board and discard the redo branch.
    ///
    /// With `limit = Some(n)`, only the newest `n` snapshots are kept in `past`.
    pub fn record(&mut self, board: &Board, action: ActionName, limit: Option<usize>) {
        self.past.push(HistorySnapshot::capture(board, action));
        self.future.clear();
        if let Some(limit) = limit
            && self.past.len() > limit
        {
            let overflow = self.past.len() - limit;
            self.past.drain(..overflow);
        }
    }

    /// Step back once. Returns the action that was undone, or `None` when `past` is empty.
    ///
    /// `board` is replaced with the restored snapshot.
    pub fn undo(&mut self, board: &mut Board) -> Option<ActionName> {
        let previous = self.past.pop()?;
        let action = previous.action;
        self.future.push(HistorySnapshot::capture(board, action));
        *board = previous.into_board();
        Some(action)
    }

    /// Step forward once. Returns the action that was redone, or `None` when `future` is empty.
    pub fn redo(&mut self, board: &mut Board) -> Option<ActionName> {
        let next = self.future.pop()?;
        let action = next.action;
        self.past.push(HistorySnapshot::capture(board, action));
        *board = next.into_board();
        Some(action)
    }
}
