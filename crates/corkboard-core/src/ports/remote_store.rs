//! RemoteStore port - 共有のキーパス・ツリーストア
//!
//! ボードの正本（source of truth）。すべてのクライアントはここに書き込み、
//! ここからの購読で状態を丸ごと置き換えます。
//!
//! # 前提とする一貫性モデル
//! - パス単位の last-write-wins
//! - パスをまたぐトランザクションはない
//! - 空の配列・マップ・null は保存されない（読み出すと「存在しない」）

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::domain::ids::SessionId;

/// StoreError はリモート操作の失敗
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("remote store is unavailable")]
    Unavailable,

    #[error("write rejected at {path}: {reason}")]
    Rejected { path: String, reason: String },

    #[error("invalid key path {0:?}")]
    InvalidPath(String),

    #[error("failed to encode payload: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Encode(e.to_string())
    }
}

/// `board/columns/{id}` のようなスラッシュ区切りのキーパス
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorePath {
    segments: Vec<String>,
}

const FORBIDDEN: [char; 5] = ['.', '#', '$', '[', ']'];

impl StorePath {
    /// Parse a slash-separated path. Leading/trailing slashes are ignored.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        let segments: Vec<String> = path
            .trim_matches('/')
            .split('/')
            .map(str::to_string)
            .collect();
        if segments
            .iter()
            .any(|s| s.is_empty() || s.contains(FORBIDDEN))
        {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(Self { segments })
    }

    /// Append one segment. Callers pass ULID keys or fixed names, which are always valid.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        debug_assert!(!segment.is_empty() && !segment.contains('/') && !segment.contains(FORBIDDEN));
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// `a/b` is an ancestor of `a/b/c` (and of itself).
    pub fn is_ancestor_of(&self, other: &StorePath) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// True when a write at `self` can change the value visible at `other` or vice versa.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// 購読: パスの値が変わるたびにそのパスの新しい値（全体）を受け取る
///
/// 購読直後に現在値が 1 回届きます（存在しなければ `None`）。
pub struct Subscription {
    path: StorePath,
    initial: Option<Option<Value>>,
    receiver: broadcast::Receiver<Option<Value>>,
}

impl Subscription {
    pub fn new(
        path: StorePath,
        initial: Option<Value>,
        receiver: broadcast::Receiver<Option<Value>>,
    ) -> Self {
        Self {
            path,
            initial: Some(initial),
            receiver,
        }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Next value at the subscribed path. `None` once the store has gone away.
    ///
    /// Every message is a full snapshot, so lagging only skips intermediate states.
    pub async fn next(&mut self) -> Option<Option<Value>> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.receiver.recv().await {
                Ok(value) => return Some(value),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(path = %self.path, skipped, "subscription lagged, skipping to latest");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Subscription::next`]: `None` when nothing is queued.
    pub fn try_next(&mut self) -> Option<Option<Value>> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.receiver.try_recv() {
                Ok(value) => return Some(value),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(path = %self.path, skipped, "subscription lagged, skipping to latest");
                }
                Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
                    return None;
                }
            }
        }
    }
}

/// RemoteStore はキーパス・ツリーストアへのアクセス
///
/// # 設計原則
/// - すべての操作は await して結果を確認する（fire-and-forget にしない）
/// - リトライや補償はしない（呼び出し側が通知とログを行う）
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// One-shot read. `None` if nothing is stored at `path`.
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError>;

    /// Destructive overwrite of the subtree at `path`. `Value::Null` removes it.
    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError>;

    /// Merge-at-path: each key of `fields` is written as a child of `path`;
    /// siblings not named in `fields` are kept.
    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError>;

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError>;

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError>;

    /// Ask the store to remove `path` when `session`'s connection drops.
    async fn on_disconnect_remove(
        &self,
        session: SessionId,
        path: &StorePath,
    ) -> Result<(), StoreError>;

    /// Close `session`'s connection; the store runs its registered disconnect instructions.
    async fn disconnect(&self, session: SessionId) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_slashes() {
        let path = StorePath::parse("/board/columns/").unwrap();
        assert_eq!(path.to_string(), "board/columns");
        assert_eq!(path.segments().len(), 2);
    }

    #[test]
    fn parse_rejects_forbidden_segments() {
        assert!(StorePath::parse("board//columns").is_err());
        assert!(StorePath::parse("board/a.b").is_err());
        assert!(StorePath::parse("").is_err());
    }

    #[test]
    fn ancestry_and_overlap() {
        let board = StorePath::parse("board").unwrap();
        let column = board.child("columns").child("abc");
        let users = StorePath::parse("users").unwrap();

        assert!(board.is_ancestor_of(&column));
        assert!(!column.is_ancestor_of(&board));
        assert!(column.overlaps(&board));
        assert!(!users.overlaps(&board));
    }
}
