//! DragEnd - ジェスチャ層から届くドラッグ終了イベント
//!
//! 形: `{source: {droppableId, index}, destination: {droppableId, index} | null,
//! draggableId, type: "column" | "task"}`。
//! カラムのドラッグではドロップ先がボード自体なので、index だけを使います。

use serde::{Deserialize, Serialize};

use super::ids::{ColumnId, TaskId};
use super::mutation::TaskLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragKind {
    Column,
    Task,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraggableLocation {
    pub droppable_id: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragEnd {
    pub source: DraggableLocation,
    /// `None` when the gesture was cancelled or dropped outside any target.
    #[serde(default)]
    pub destination: Option<DraggableLocation>,
    #[serde(rename = "draggableId")]
    pub draggable_id: String,
    #[serde(rename = "type")]
    pub kind: DragKind,
}

/// What a completed drag asks the board to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragIntent {
    ReorderColumns {
        source: usize,
        destination: usize,
    },
    ReorderTasks {
        source: TaskLocation,
        destination: TaskLocation,
        task_id: TaskId,
    },
}

/// Why a drag event could not be turned into an intent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DragError {
    #[error("droppable id {0:?} is not a column id")]
    UnknownDroppable(String),

    #[error("draggable id {0:?} is not a task id")]
    UnknownDraggable(String),
}

impl DragEnd {
    /// `Ok(None)` for a cancelled gesture (no destination).
    pub fn intent(&self) -> Result<Option<DragIntent>, DragError> {
        let Some(destination) = &self.destination else {
            return Ok(None);
        };

        let intent = match self.kind {
            DragKind::Column => DragIntent::ReorderColumns {
                source: self.source.index,
                destination: destination.index,
            },
            DragKind::Task => DragIntent::ReorderTasks {
                source: task_location(&self.source)?,
                destination: task_location(destination)?,
                task_id: TaskId::parse_key(&self.draggable_id)
                    .ok_or_else(|| DragError::UnknownDraggable(self.draggable_id.clone()))?,
            },
        };
        Ok(Some(intent))
    }
}

fn task_location(location: &DraggableLocation) -> Result<TaskLocation, DragError> {
    let column_id = ColumnId::parse_key(&location.droppable_id)
        .ok_or_else(|| DragError::UnknownDroppable(location.droppable_id.clone()))?;
    Ok(TaskLocation::new(column_id, location.index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ulid::Ulid;

    #[test]
    fn cancelled_drag_has_no_intent() {
        let event: DragEnd = serde_json::from_value(json!({
            "source": { "droppableId": "board", "index": 0 },
            "destination": null,
            "draggableId": "whatever",
            "type": "column"
        }))
        .unwrap();

        assert_eq!(event.intent(), Ok(None));
    }

    #[test]
    fn column_drag_uses_global_indices() {
        let event: DragEnd = serde_json::from_value(json!({
            "source": { "droppableId": "board", "index": 2 },
            "destination": { "droppableId": "board", "index": 0 },
            "draggableId": "col",
            "type": "column"
        }))
        .unwrap();

        assert_eq!(
            event.intent(),
            Ok(Some(DragIntent::ReorderColumns {
                source: 2,
                destination: 0
            }))
        );
    }

    #[test]
    fn task_drag_resolves_typed_ids() {
        let from = ColumnId::from_ulid(Ulid::new());
        let to = ColumnId::from_ulid(Ulid::new());
        let task = TaskId::from_ulid(Ulid::new());
        let event: DragEnd = serde_json::from_value(json!({
            "source": { "droppableId": from.key(), "index": 0 },
            "destination": { "droppableId": to.key(), "index": 1 },
            "draggableId": task.key(),
            "type": "task"
        }))
        .unwrap();

        assert_eq!(
            event.intent(),
            Ok(Some(DragIntent::ReorderTasks {
                source: TaskLocation::new(from, 0),
                destination: TaskLocation::new(to, 1),
                task_id: task,
            }))
        );
    }

    #[test]
    fn task_drag_with_bad_droppable_is_an_error() {
        let event = DragEnd {
            source: DraggableLocation {
                droppable_id: "board".into(),
                index: 0,
            },
            destination: Some(DraggableLocation {
                droppable_id: "board".into(),
                index: 1,
            }),
            draggable_id: TaskId::from_ulid(Ulid::new()).key(),
            kind: DragKind::Task,
        };

        assert_eq!(
            event.intent(),
            Err(DragError::UnknownDroppable("board".into()))
        );
    }
}
