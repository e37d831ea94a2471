//! RemoteMirror - ローカル状態とリモートツリーの同期
//!
//! # 学習ポイント
//! - Outbound: 作成はエンティティ全体、編集は変更したフィールドだけを
//!   1 回のマルチパス update で書く（他セッションが書いた兄弟フィールドを消さない）
//! - Undo/Redo: columns / columnOrder / tasks / history を丸ごと上書き
//! - Inbound: 購読の通知ごとにローカルの Board / History を置き換える（マージしない）。
//!   デコードはエントリ単位で、壊れたノードだけを読み飛ばす
//!
//! リモートのレイアウト（`board` は設定で変更可）:
//! ```text
//! board/columns/{columnId}
//! board/columnOrder
//! board/tasks/{taskId}
//! board/tasks/{taskId}/comments/{commentId}
//! board/history
//! ```

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::domain::{
    Board, BoardState, Change, Column, ColumnId, Comment, CommentId, History, Task, TaskId,
};
use crate::ports::{RemoteStore, StoreError, StorePath, Subscription};

const COLUMNS: &str = "columns";
const COLUMN_ORDER: &str = "columnOrder";
const TASKS: &str = "tasks";
const COMMENTS: &str = "comments";
const HISTORY: &str = "history";

/// Writes local changes to the shared board and opens its subscriptions.
pub struct RemoteMirror {
    store: Arc<dyn RemoteStore>,
    board_path: StorePath,
    history_path: StorePath,
}

impl RemoteMirror {
    pub fn new(store: Arc<dyn RemoteStore>, board_path: StorePath) -> Self {
        let history_path = board_path.child(HISTORY);
        Self {
            store,
            board_path,
            history_path,
        }
    }

    pub fn board_path(&self) -> &StorePath {
        &self.board_path
    }

    pub fn history_path(&self) -> &StorePath {
        &self.history_path
    }

    /// Build the write for one applied mutation: each changed subtree or field
    /// (null for removals) plus the whole history.
    ///
    /// Creations write the whole entity; edits write only their fields so they
    /// merge into the remote node. A mutation that changed nothing still writes
    /// its history entry.
    pub fn mutation_payload(
        state: &BoardState,
        changes: &[Change],
    ) -> Result<Map<String, Value>, StoreError> {
        let board = state.board();
        let mut fields = Map::new();

        for change in changes {
            match *change {
                Change::ColumnCreated(id) => {
                    fields.insert(column_key(id), encode_or_null(board.column(id))?);
                }
                Change::ColumnEdited(id) => {
                    if let Some(column) = board.column(id) {
                        let key = column_key(id);
                        fields.insert(format!("{key}/title"), encode(&column.title)?);
                    }
                }
                Change::ColumnTasks(id) => {
                    if let Some(column) = board.column(id) {
                        let key = column_key(id);
                        fields.insert(format!("{key}/taskIds"), encode(&column.task_ids)?);
                    }
                }
                Change::ColumnRemoved(id) => {
                    fields.insert(column_key(id), Value::Null);
                }
                Change::ColumnOrder => {
                    fields.insert(COLUMN_ORDER.to_string(), encode(&board.column_order)?);
                }
                Change::TaskCreated(id) => {
                    fields.insert(task_key(id), encode_or_null(board.task(id))?);
                }
                Change::TaskEdited(id) => {
                    if let Some(task) = board.task(id) {
                        let key = task_key(id);
                        fields.insert(format!("{key}/title"), encode(&task.title)?);
                        fields.insert(format!("{key}/description"), encode(&task.description)?);
                        fields.insert(format!("{key}/updatedAt"), encode(&task.updated_at)?);
                    }
                }
                Change::TaskRemoved(id) => {
                    fields.insert(task_key(id), Value::Null);
                }
                Change::CommentCreated {
                    task_id,
                    comment_id,
                } => {
                    let comment = board
                        .task(task_id)
                        .and_then(|task| task.comments.get(&comment_id));
                    fields.insert(comment_key(task_id, comment_id), encode_or_null(comment)?);
                }
                Change::CommentEdited {
                    task_id,
                    comment_id,
                } => {
                    if let Some(comment) = board
                        .task(task_id)
                        .and_then(|task| task.comments.get(&comment_id))
                    {
                        let key = comment_key(task_id, comment_id);
                        fields.insert(format!("{key}/text"), encode(&comment.text)?);
                        fields.insert(format!("{key}/updatedAt"), encode(&comment.updated_at)?);
                    }
                }
                Change::CommentRemoved {
                    task_id,
                    comment_id,
                } => {
                    fields.insert(comment_key(task_id, comment_id), Value::Null);
                }
            }
        }

        fields.insert(HISTORY.to_string(), encode(state.history())?);
        Ok(fields)
    }

    /// Build the destructive overwrite used after undo/redo.
    pub fn replacement_payload(state: &BoardState) -> Result<Map<String, Value>, StoreError> {
        let board = state.board();
        let mut fields = Map::new();
        fields.insert(COLUMNS.to_string(), encode(&board.columns)?);
        fields.insert(COLUMN_ORDER.to_string(), encode(&board.column_order)?);
        fields.insert(TASKS.to_string(), encode(&board.tasks)?);
        fields.insert(HISTORY.to_string(), encode(state.history())?);
        Ok(fields)
    }

    /// One multi-path write under the board root.
    pub async fn push(&self, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.store.update(&self.board_path, fields).await
    }

    pub async fn subscribe_board(&self) -> Result<Subscription, StoreError> {
        self.store.subscribe(&self.board_path).await
    }

    pub async fn subscribe_history(&self) -> Result<Subscription, StoreError> {
        self.store.subscribe(&self.history_path).await
    }
}

fn column_key(id: ColumnId) -> String {
    format!("{COLUMNS}/{}", id.key())
}

fn task_key(id: TaskId) -> String {
    format!("{TASKS}/{}", id.key())
}

fn comment_key(task: TaskId, comment: CommentId) -> String {
    format!("{}/{COMMENTS}/{}", task_key(task), comment.key())
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

fn encode_or_null<T: Serialize>(value: Option<&T>) -> Result<Value, StoreError> {
    match value {
        Some(value) => encode(value),
        None => Ok(Value::Null),
    }
}

/// Decode a remote board snapshot entry by entry.
///
/// Concurrent field-level writes can leave partial nodes behind (a task that was
/// deleted while another session commented on it keeps only `comments`).
/// Undecodable entries are skipped so the rest of the board survives.
pub fn decode_board(value: Option<Value>) -> Board {
    let Some(Value::Object(mut root)) = value else {
        return Board::default();
    };

    let columns = decode_entries::<Column>(COLUMNS, root.remove(COLUMNS))
        .into_iter()
        .map(|column| (column.id, column))
        .collect();
    let column_order = match root.remove(COLUMN_ORDER) {
        None | Some(Value::Null) => Vec::new(),
        Some(order) => serde_json::from_value(order).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring undecodable columnOrder");
            Vec::new()
        }),
    };
    let tasks = entries(TASKS, root.remove(TASKS))
        .filter_map(|(key, value)| decode_task(&key, value))
        .map(|task| (task.id, task))
        .collect();

    Board {
        columns,
        column_order,
        tasks,
    }
}

/// Children of an object node. Anything else has no entries.
fn entries(kind: &'static str, value: Option<Value>) -> impl Iterator<Item = (String, Value)> {
    let map = match value {
        Some(Value::Object(map)) => map,
        None | Some(Value::Null) => Map::new(),
        Some(_) => {
            tracing::warn!(kind, "ignoring non-object collection");
            Map::new()
        }
    };
    map.into_iter()
}

fn decode_entries<T: DeserializeOwned>(kind: &'static str, value: Option<Value>) -> Vec<T> {
    entries(kind, value)
        .filter_map(|(key, value)| match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(kind, key, error = %e, "skipping undecodable entry");
                None
            }
        })
        .collect()
}

/// Comments are decoded one at a time so a single bad comment keeps its task.
fn decode_task(key: &str, value: Value) -> Option<Task> {
    let Value::Object(mut fields) = value else {
        tracing::warn!(kind = TASKS, key, "skipping non-object task");
        return None;
    };
    let comments = fields.remove(COMMENTS);
    let mut task: Task = match serde_json::from_value(Value::Object(fields)) {
        Ok(task) => task,
        Err(e) => {
            tracing::warn!(kind = TASKS, key, error = %e, "skipping undecodable entry");
            return None;
        }
    };
    task.comments = decode_entries::<Comment>(COMMENTS, comments)
        .into_iter()
        .map(|comment| (comment.id, comment))
        .collect();
    Some(task)
}

/// Decode a remote history snapshot. Missing or malformed data is an empty history.
pub fn decode_history(value: Option<Value>) -> History {
    let Some(value) = value else {
        return History::default();
    };
    match serde_json::from_value(value) {
        Ok(history) => history,
        Err(e) => {
            tracing::warn!(error = %e, "discarding undecodable history snapshot");
            History::default()
        }
    }
}

/// Replace the local board with a remote snapshot.
///
/// Inconsistent snapshots are logged and applied anyway; the remote tree is the source of truth.
pub fn replace_board(state: &mut BoardState, value: Option<Value>) {
    let board = decode_board(value);
    if let Err(violation) = board.check_invariants() {
        tracing::warn!(%violation, "remote board breaks an invariant");
    }
    tracing::debug!(
        columns = board.columns.len(),
        tasks = board.tasks.len(),
        "inbound board snapshot"
    );
    state.replace_board(board);
}

/// Replace the local history with a remote snapshot.
pub fn replace_history(state: &mut BoardState, value: Option<Value>) {
    let history = decode_history(value);
    tracing::debug!(
        past = history.past.len(),
        future = history.future.len(),
        "inbound history snapshot"
    );
    state.replace_history(history);
}

/// Feed notifications into `apply` until the store goes away.
///
/// Outbound writes are made while holding the state lock, so once the lock is
/// taken here the echoes of every local write are already queued. Only the
/// newest queued snapshot is applied.
pub(crate) fn spawn_inbound<F>(
    mut subscription: Subscription,
    state: Arc<Mutex<BoardState>>,
    apply: F,
) -> JoinHandle<()>
where
    F: Fn(&mut BoardState, Option<Value>) + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(mut value) = subscription.next().await {
            let mut state = state.lock().await;
            while let Some(newer) = subscription.try_next() {
                value = newer;
            }
            apply(&mut state, value);
        }
        tracing::info!(path = %subscription.path(), "subscription closed");
    })
}
