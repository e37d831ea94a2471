//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID + ジェネリック実装
//! Column / Task / Comment / Session の ID はすべて ULID です。
//! Phantom type パターンで `Id<T>` の実装を共有しつつ、
//! `ColumnId` と `TaskId` を混同できないようにしています。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: Comment の挿入順 = キー生成順 になる
//! - **分散生成可能**: 各クライアントが調整なしで ID を発行できる
//!
//! ## ワイヤ表現
//! - serde / リモートのキーパスでは素の ULID 文字列（`01H...`）
//! - `Display` はログ用にプレフィックス付き（`column-01H...`）

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// Display で使うプレフィックス（例: "column-", "task-"）
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は PhantomData で、実行時にはメモリを消費しません。
/// serde では `#[serde(transparent)]` により ULID 文字列そのものとして扱われるため、
/// `BTreeMap<TaskId, Task>` のマップキーとしてもそのまま使えます。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// ULID から Id を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }

    /// リモートストアのキーパスで使う表現（プレフィックスなし）
    pub fn key(&self) -> String {
        self.ulid.to_string()
    }

    /// キーパスの文字列から復元する。ULID として不正なら `None`。
    pub fn parse_key(key: &str) -> Option<Self> {
        Ulid::from_string(key).ok().map(Self::from_ulid)
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Column のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {}

impl IdMarker for Column {
    fn prefix() -> &'static str {
        "column-"
    }
}

/// Task のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Comment のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Comment {}

impl IdMarker for Comment {
    fn prefix() -> &'static str {
        "comment-"
    }
}

/// Session のマーカー型（ブラウザロードごとに 1 つ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Session {}

impl IdMarker for Session {
    fn prefix() -> &'static str {
        "session-"
    }
}

// ========================================
// Type Alias
// ========================================

/// Identifier of a board column.
pub type ColumnId = Id<Column>;

/// Identifier of a task card.
pub type TaskId = Id<Task>;

/// Identifier of a comment on a task.
pub type CommentId = Id<Comment>;

/// Identifier of one connected client session (also used as the comment author).
pub type SessionId = Id<Session>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn ids_are_distinct_types() {
        let ulid1 = Ulid::new();
        let ulid2 = Ulid::new();

        let column = ColumnId::from_ulid(ulid1);
        let task = TaskId::from_ulid(ulid2);

        assert_eq!(column.as_ulid(), ulid1);
        assert_eq!(task.as_ulid(), ulid2);

        assert!(column.to_string().starts_with("column-"));
        assert!(task.to_string().starts_with("task-"));
        // let _: ColumnId = task; // <- does not compile
    }

    #[test]
    fn serialized_form_is_the_bare_ulid() {
        let ulid = Ulid::new();
        let task_id = TaskId::from_ulid(ulid);

        let json = serde_json::to_value(task_id).unwrap();
        assert_eq!(json, serde_json::Value::String(ulid.to_string()));
        assert_eq!(task_id.key(), ulid.to_string());
    }

    #[test]
    fn ids_work_as_json_map_keys() {
        let a = CommentId::from_ulid(Ulid::new());
        let mut map = BTreeMap::new();
        map.insert(a, "first");

        let serialized = serde_json::to_string(&map).unwrap();
        let back: BTreeMap<CommentId, String> = serde_json::from_str(&serialized).unwrap();
        assert_eq!(back.get(&a).map(String::as_str), Some("first"));
    }

    #[test]
    fn parse_key_rejects_garbage() {
        let id = ColumnId::from_ulid(Ulid::new());
        assert_eq!(ColumnId::parse_key(&id.key()), Some(id));
        assert_eq!(ColumnId::parse_key("not-a-ulid"), None);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<ColumnId>(), size_of::<Ulid>());
        assert_eq!(size_of::<SessionId>(), 16);
    }
}
