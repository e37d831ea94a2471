//! Domain model (ids, board, mutations, history, errors, notices).
//!
//! このモジュールは純粋なデータと状態遷移のみを扱います。
//! リモートストア・時計・ID 生成などの外部依存は `ports` 経由で app 層が注入します。

pub mod action;
pub mod board;
pub mod drag;
pub mod engine;
pub mod errors;
pub mod events;
pub mod history;
pub mod ids;
pub mod mutation;

pub use self::action::ActionName;
pub use self::board::{Board, Column, Comment, InvariantViolation, Task};
pub use self::drag::{DragEnd, DragError, DragIntent, DragKind, DraggableLocation};
pub use self::engine::BoardState;
pub use self::errors::{BuildError, CorkboardError, ErrorKind, Field, ValidationError};
pub use self::events::{Notice, Operation};
pub use self::history::{History, HistorySnapshot};
pub use self::ids::{ColumnId, CommentId, SessionId, TaskId};
pub use self::mutation::{Applied, Change, Mutation, TaskLocation};
