//! BoardClient - 1 セッション分のボード操作の表面
//!
//! # 処理の流れ（ミューテーション）
//! 1. 入力検証（失敗: Rejected 通知、何も変更しない）
//! 2. ローカルの Board に適用し、履歴に記録
//! 3. 変更サブツリー + 履歴をリモートへ書き込む（await して結果を確認）
//! 4. 成功: プレゼンスのラベル更新 + Synced 通知 / 失敗: SyncFailed 通知（ロールバックしない）
//!
//! 手順 1-3 は状態ロックを保持したまま行います。受信した購読通知は
//! ローカル状態を無条件に置き換えますが、ロック待ちの間に溜まった通知は最新の 1 件だけを適用します。

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::app::presence::{PresenceRecord, PresenceTracker};
use crate::app::status::BoardStatus;
use crate::app::sync::{self, RemoteMirror};
use crate::domain::{
    ActionName, Applied, Board, BoardState, ColumnId, CommentId, CorkboardError, DragEnd,
    DragIntent, History, Mutation, Notice, Operation, SessionId, TaskId, TaskLocation,
};
use crate::ports::{Clock, EventSink, IdGenerator, StoreError};

/// Outcome of the remote half of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Synced,
    /// The local change stands; the remote tree does not have it.
    Diverged(StoreError),
}

impl RemoteStatus {
    pub fn is_synced(&self) -> bool {
        matches!(self, RemoteStatus::Synced)
    }
}

/// Result of a mutation that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReport {
    pub applied: Applied,
    pub remote: RemoteStatus,
}

/// Result of an undo or redo that had something to restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryReport {
    pub action: ActionName,
    pub remote: RemoteStatus,
}

/// One session's view of the shared board.
///
/// Build with [`crate::app::ClientBuilder`], then call [`BoardClient::connect`].
pub struct BoardClient {
    state: Arc<Mutex<BoardState>>,
    mirror: RemoteMirror,
    presence: PresenceTracker,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    sink: Arc<dyn EventSink>,
    followers: Vec<JoinHandle<()>>,
}

impl BoardClient {
    pub(crate) fn new(
        mirror: RemoteMirror,
        presence: PresenceTracker,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        sink: Arc<dyn EventSink>,
        history_limit: Option<usize>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(BoardState::new(history_limit))),
            mirror,
            presence,
            clock,
            ids,
            sink,
            followers: Vec::new(),
        }
    }

    pub fn session(&self) -> SessionId {
        self.presence.session()
    }

    /// Load the shared board and history, register presence, and keep following
    /// remote changes in the background.
    pub async fn connect(&mut self) -> Result<(), CorkboardError> {
        let mut board = self.mirror.subscribe_board().await?;
        let mut history = self.mirror.subscribe_history().await?;
        let initial_board = board.next().await.flatten();
        let initial_history = history.next().await.flatten();
        {
            let mut state = self.state.lock().await;
            sync::replace_board(&mut state, initial_board);
            sync::replace_history(&mut state, initial_history);
        }

        self.followers.push(sync::spawn_inbound(
            board,
            Arc::clone(&self.state),
            sync::replace_board,
        ));
        self.followers.push(sync::spawn_inbound(
            history,
            Arc::clone(&self.state),
            sync::replace_history,
        ));
        self.followers.push(self.presence.start().await?);

        tracing::info!(session = %self.session(), path = %self.mirror.board_path(), "connected");
        Ok(())
    }

    /// Stop following remote changes and drop this session's presence record.
    pub async fn disconnect(&mut self) -> Result<(), CorkboardError> {
        for follower in self.followers.drain(..) {
            follower.abort();
        }
        self.presence.disconnect().await?;
        Ok(())
    }

    // ========================================
    // Mutations
    // ========================================

    /// Validate, apply locally, then mirror the change remotely.
    ///
    /// `Err` only for rejected input. A failed remote write is reported through
    /// [`MutationReport::remote`] and leaves the local change in place.
    pub async fn apply(&self, mutation: Mutation) -> Result<MutationReport, CorkboardError> {
        let now = self.clock.now();
        let (applied, result) = {
            let mut state = self.state.lock().await;
            let applied = match state.apply(mutation, now) {
                Ok(applied) => applied,
                Err(e) => {
                    tracing::warn!(session = %self.session(), error = %e, "mutation rejected");
                    self.sink.emit(Notice::Rejected(e.to_string()));
                    return Err(e.into());
                }
            };
            if applied.is_noop() {
                tracing::debug!(action = %applied.action, "mutation matched nothing; recording history only");
            }
            let payload = RemoteMirror::mutation_payload(&state, &applied.changes);
            (applied, self.push(payload).await)
        };

        let remote = self
            .report(Operation::Mutation(applied.action), &applied.label, result)
            .await;
        Ok(MutationReport { applied, remote })
    }

    pub async fn add_column(
        &self,
        title: impl Into<String>,
    ) -> Result<(ColumnId, MutationReport), CorkboardError> {
        let column_id = self.ids.generate_column_id();
        let report = self
            .apply(Mutation::AddColumn {
                column_id,
                title: title.into(),
            })
            .await?;
        Ok((column_id, report))
    }

    pub async fn update_column(
        &self,
        column_id: ColumnId,
        title: impl Into<String>,
    ) -> Result<MutationReport, CorkboardError> {
        self.apply(Mutation::UpdateColumn {
            column_id,
            title: title.into(),
        })
        .await
    }

    /// Deletes the column and every task it owns.
    pub async fn delete_column(&self, column_id: ColumnId) -> Result<MutationReport, CorkboardError> {
        self.apply(Mutation::DeleteColumn { column_id }).await
    }

    pub async fn add_task(
        &self,
        column_id: ColumnId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(TaskId, MutationReport), CorkboardError> {
        let task_id = self.ids.generate_task_id();
        let report = self
            .apply(Mutation::AddTask {
                column_id,
                task_id,
                title: title.into(),
                description: description.into(),
            })
            .await?;
        Ok((task_id, report))
    }

    pub async fn update_task(
        &self,
        task_id: TaskId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<MutationReport, CorkboardError> {
        self.apply(Mutation::UpdateTask {
            task_id,
            title: title.into(),
            description: description.into(),
        })
        .await
    }

    pub async fn delete_task(
        &self,
        task_id: TaskId,
        column_id: ColumnId,
    ) -> Result<MutationReport, CorkboardError> {
        self.apply(Mutation::DeleteTask { task_id, column_id }).await
    }

    pub async fn reorder_tasks(
        &self,
        source: TaskLocation,
        destination: TaskLocation,
        task_id: TaskId,
    ) -> Result<MutationReport, CorkboardError> {
        self.apply(Mutation::ReorderTasks {
            source,
            destination,
            task_id,
        })
        .await
    }

    pub async fn reorder_columns(
        &self,
        source: usize,
        destination: usize,
    ) -> Result<MutationReport, CorkboardError> {
        self.apply(Mutation::ReorderColumns {
            source,
            destination,
        })
        .await
    }

    /// The comment is attributed to this client's session.
    pub async fn add_comment(
        &self,
        task_id: TaskId,
        text: impl Into<String>,
    ) -> Result<(CommentId, MutationReport), CorkboardError> {
        let comment_id = self.ids.generate_comment_id();
        let report = self
            .apply(Mutation::AddComment {
                task_id,
                comment_id,
                text: text.into(),
                author: self.session(),
            })
            .await?;
        Ok((comment_id, report))
    }

    pub async fn update_comment(
        &self,
        task_id: TaskId,
        comment_id: CommentId,
        text: impl Into<String>,
    ) -> Result<MutationReport, CorkboardError> {
        self.apply(Mutation::UpdateComment {
            task_id,
            comment_id,
            text: text.into(),
        })
        .await
    }

    pub async fn delete_comment(
        &self,
        task_id: TaskId,
        comment_id: CommentId,
    ) -> Result<MutationReport, CorkboardError> {
        self.apply(Mutation::DeleteComment {
            task_id,
            comment_id,
        })
        .await
    }

    /// Route a completed drag gesture. A cancelled drag (no destination) does nothing.
    pub async fn handle_drag_end(
        &self,
        event: &DragEnd,
    ) -> Result<Option<MutationReport>, CorkboardError> {
        let intent = match event.intent() {
            Ok(intent) => intent,
            Err(e) => {
                tracing::warn!(error = %e, "drag event rejected");
                self.sink.emit(Notice::Rejected(e.to_string()));
                return Err(e.into());
            }
        };
        let Some(intent) = intent else {
            return Ok(None);
        };

        let report = match intent {
            DragIntent::ReorderColumns {
                source,
                destination,
            } => self.reorder_columns(source, destination).await?,
            DragIntent::ReorderTasks {
                source,
                destination,
                task_id,
            } => self.reorder_tasks(source, destination, task_id).await?,
        };
        Ok(Some(report))
    }

    // ========================================
    // Undo / Redo
    // ========================================

    /// `None` (with a notice) when there is nothing to undo.
    pub async fn undo(&self) -> Option<HistoryReport> {
        let (action, result) = {
            let mut state = self.state.lock().await;
            let Some(action) = state.undo() else {
                tracing::info!(session = %self.session(), "nothing to undo");
                self.sink.emit(Notice::NothingToUndo);
                return None;
            };
            let payload = RemoteMirror::replacement_payload(&state);
            (action, self.push(payload).await)
        };
        let label = format!("Undid action: {action}");
        let remote = self.report(Operation::Undo, &label, result).await;
        Some(HistoryReport { action, remote })
    }

    /// `None` (with a notice) when there is nothing to redo.
    pub async fn redo(&self) -> Option<HistoryReport> {
        let (action, result) = {
            let mut state = self.state.lock().await;
            let Some(action) = state.redo() else {
                tracing::info!(session = %self.session(), "nothing to redo");
                self.sink.emit(Notice::NothingToRedo);
                return None;
            };
            let payload = RemoteMirror::replacement_payload(&state);
            (action, self.push(payload).await)
        };
        let label = format!("Redid action: {action}");
        let remote = self.report(Operation::Redo, &label, result).await;
        Some(HistoryReport { action, remote })
    }

    pub async fn can_undo(&self) -> bool {
        self.state.lock().await.history().can_undo()
    }

    pub async fn can_redo(&self) -> bool {
        self.state.lock().await.history().can_redo()
    }

    // ========================================
    // Inbound sync
    // ========================================

    /// Replace the local board with a remote snapshot (`None` = empty board).
    pub async fn apply_remote_board(&self, value: Option<Value>) {
        sync::replace_board(&mut *self.state.lock().await, value);
    }

    /// Replace the local history with a remote snapshot (`None` = empty history).
    pub async fn apply_remote_history(&self, value: Option<Value>) {
        sync::replace_history(&mut *self.state.lock().await, value);
    }

    // ========================================
    // Queries
    // ========================================

    pub async fn board(&self) -> Board {
        self.state.lock().await.board().clone()
    }

    pub async fn history(&self) -> History {
        self.state.lock().await.history().clone()
    }

    pub fn active_users(&self) -> Vec<PresenceRecord> {
        self.presence.active()
    }

    pub async fn status(&self) -> BoardStatus {
        let active = self.presence.active().len();
        BoardStatus::collect(&*self.state.lock().await, active)
    }

    /// Callers hold the state lock, so inbound echoes queue up behind the write.
    async fn push(&self, payload: Result<Map<String, Value>, StoreError>) -> Result<(), StoreError> {
        self.mirror.push(payload?).await
    }

    async fn report(
        &self,
        operation: Operation,
        label: &str,
        result: Result<(), StoreError>,
    ) -> RemoteStatus {
        match result {
            Ok(()) => {
                tracing::info!(session = %self.session(), ?operation, "remote write synced");
                if let Err(e) = self.presence.update_action(label).await {
                    tracing::warn!(session = %self.session(), error = %e, "failed to update presence");
                }
                self.sink.emit(Notice::Synced(operation));
                RemoteStatus::Synced
            }
            Err(e) => {
                tracing::error!(
                    session = %self.session(),
                    ?operation,
                    error = %e,
                    "remote write failed; local state diverges until the next inbound sync"
                );
                self.sink.emit(Notice::SyncFailed {
                    operation,
                    error: e.to_string(),
                });
                RemoteStatus::Diverged(e)
            }
        }
    }
}

impl Drop for BoardClient {
    fn drop(&mut self) {
        for follower in &self.followers {
            follower.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use crate::app::ClientBuilder;
    use crate::domain::{DragKind, DraggableLocation, ErrorKind};
    use crate::impls::{InMemoryRemoteStore, MemoryEventSink};
    use crate::ports::{FixedClock, RemoteStore, StorePath};

    struct Fixture {
        store: Arc<InMemoryRemoteStore>,
        sink: Arc<MemoryEventSink>,
        client: BoardClient,
    }

    async fn connected() -> Fixture {
        let store = Arc::new(InMemoryRemoteStore::new());
        let sink = Arc::new(MemoryEventSink::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let mut client = ClientBuilder::new(store.clone())
            .clock(clock)
            .sink(sink.clone())
            .build()
            .unwrap();
        client.connect().await.unwrap();
        Fixture {
            store,
            sink,
            client,
        }
    }

    fn path(s: &str) -> StorePath {
        StorePath::parse(s).unwrap()
    }

    #[tokio::test]
    async fn mutation_is_applied_locally_and_mirrored() {
        let fx = connected().await;
        let (col, report) = fx.client.add_column("To Do").await.unwrap();
        assert!(report.remote.is_synced());
        assert_eq!(report.applied.label, "Added column: To Do");

        let board = fx.client.board().await;
        assert_eq!(board.column_order, vec![col]);

        let remote = fx.store.get(&path("board/columnOrder")).await.unwrap();
        assert_eq!(remote, Some(json!([col.key()])));
        assert_eq!(
            fx.sink.last(),
            Some(Notice::Synced(Operation::Mutation(ActionName::AddColumn)))
        );

        let me = path("users").child(fx.client.session().key());
        let presence = fx.store.get(&me).await.unwrap().unwrap();
        assert_eq!(presence["action"], json!("Added column: To Do"));
    }

    #[tokio::test]
    async fn rejected_input_changes_nothing() {
        let fx = connected().await;
        let err = fx.client.add_column("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            fx.sink.last(),
            Some(Notice::Rejected("Column title cannot be empty.".into()))
        );
        assert!(!fx.client.can_undo().await);
        assert_eq!(fx.store.get(&path("board")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn remote_failure_keeps_local_change() {
        let fx = connected().await;
        fx.store.set_offline(true).await;

        let (col, report) = fx.client.add_column("To Do").await.unwrap();
        assert_eq!(report.remote, RemoteStatus::Diverged(StoreError::Unavailable));
        assert!(fx.client.board().await.column(col).is_some());
        assert_eq!(
            fx.sink.last(),
            Some(Notice::SyncFailed {
                operation: Operation::Mutation(ActionName::AddColumn),
                error: StoreError::Unavailable.to_string(),
            })
        );
    }

    #[tokio::test]
    async fn undo_and_redo_overwrite_the_remote_board() {
        let fx = connected().await;
        let (col, _) = fx.client.add_column("To Do").await.unwrap();
        fx.client.add_task(col, "Write", "").await.unwrap();

        let undone = fx.client.undo().await.unwrap();
        assert_eq!(undone.action, ActionName::AddTask);
        assert!(undone.remote.is_synced());
        assert_eq!(fx.store.get(&path("board/tasks")).await.unwrap(), None);
        assert!(fx.client.can_redo().await);

        let redone = fx.client.redo().await.unwrap();
        assert_eq!(redone.action, ActionName::AddTask);
        assert_eq!(fx.client.board().await.tasks.len(), 1);
        assert!(fx.store.get(&path("board/tasks")).await.unwrap().is_some());

        let me = path("users").child(fx.client.session().key());
        let presence = fx.store.get(&me).await.unwrap().unwrap();
        assert_eq!(presence["action"], json!("Redid action: addTask"));
    }

    #[tokio::test]
    async fn empty_history_is_a_notice() {
        let fx = connected().await;
        assert!(fx.client.undo().await.is_none());
        assert_eq!(fx.sink.last(), Some(Notice::NothingToUndo));
        assert!(fx.client.redo().await.is_none());
        assert_eq!(fx.sink.last(), Some(Notice::NothingToRedo));
    }

    #[tokio::test]
    async fn drag_end_routes_to_reorder() {
        let fx = connected().await;
        let (a, _) = fx.client.add_column("A").await.unwrap();
        let (b, _) = fx.client.add_column("B").await.unwrap();

        let cancelled = DragEnd {
            source: DraggableLocation {
                droppable_id: "board".into(),
                index: 0,
            },
            destination: None,
            draggable_id: a.key(),
            kind: DragKind::Column,
        };
        assert_eq!(fx.client.handle_drag_end(&cancelled).await.unwrap(), None);

        let moved = DragEnd {
            destination: Some(DraggableLocation {
                droppable_id: "board".into(),
                index: 1,
            }),
            ..cancelled
        };
        let report = fx.client.handle_drag_end(&moved).await.unwrap().unwrap();
        assert_eq!(report.applied.action, ActionName::ReorderColumns);
        assert_eq!(fx.client.board().await.column_order, vec![b, a]);
    }

    #[tokio::test]
    async fn comments_are_attributed_to_the_session() {
        let fx = connected().await;
        let (col, _) = fx.client.add_column("To Do").await.unwrap();
        let (task, _) = fx.client.add_task(col, "Write", "").await.unwrap();
        let (comment, _) = fx.client.add_comment(task, "first").await.unwrap();

        let board = fx.client.board().await;
        let stored = &board.task(task).unwrap().comments[&comment];
        assert_eq!(stored.user_id, fx.client.session());

        let remote = fx
            .store
            .get(&path(&format!("board/tasks/{}/comments/{}", task.key(), comment.key())))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(remote["text"], json!("first"));
    }

    #[tokio::test]
    async fn comments_iterate_in_insertion_order() {
        let fx = connected().await;
        let (col, _) = fx.client.add_column("To Do").await.unwrap();
        let (task, _) = fx.client.add_task(col, "Write", "").await.unwrap();
        for text in ["first", "second", "third"] {
            fx.client.add_comment(task, text).await.unwrap();
        }

        let texts = |board: &Board| -> Vec<String> {
            board
                .task(task)
                .unwrap()
                .comments_in_order()
                .map(|comment| comment.text.clone())
                .collect()
        };
        assert_eq!(texts(&fx.client.board().await), ["first", "second", "third"]);

        // The same order after a round trip through the shared tree.
        let remote = fx.store.get(&path("board")).await.unwrap();
        assert_eq!(texts(&sync::decode_board(remote)), ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn status_counts_board_history_and_presence() {
        let fx = connected().await;
        let (col, _) = fx.client.add_column("To Do").await.unwrap();
        fx.client.add_task(col, "Write", "").await.unwrap();

        let status = fx.client.status().await;
        assert_eq!(status.columns, 1);
        assert_eq!(status.tasks, 1);
        assert_eq!(status.past, 2);
        assert_eq!(status.active_users, 1);
    }

    #[tokio::test]
    async fn disconnect_removes_presence() {
        let mut fx = connected().await;
        let me = path("users").child(fx.client.session().key());
        assert!(fx.store.get(&me).await.unwrap().is_some());

        fx.client.disconnect().await.unwrap();
        assert_eq!(fx.store.get(&me).await.unwrap(), None);
    }
}
