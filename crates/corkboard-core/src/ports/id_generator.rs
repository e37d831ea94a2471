//! IdGenerator port - ID 生成の抽象化
//!
//! Column / Task / Comment / Session の ID を発行します。
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: 単調増加 ULID（本番用）

use std::sync::Mutex;
use std::time::SystemTime;

use ulid::{Generator, Ulid};

use crate::domain::ids::{ColumnId, CommentId, SessionId, TaskId};
use crate::ports::Clock;

/// IdGenerator は分散環境で衝突しない ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（購読タスクとクライアントで共有する）
pub trait IdGenerator: Send + Sync {
    fn generate_column_id(&self) -> ColumnId;

    fn generate_task_id(&self) -> TaskId;

    /// 同じクライアント内では生成順にソートされる（コメントの挿入順になる）
    fn generate_comment_id(&self) -> CommentId;

    fn generate_session_id(&self) -> SessionId;
}

/// UlidGenerator は Clock ベースの単調増加 ULID 生成器
///
/// 同一ミリ秒内でもランダム部分をインクリメントするため、
/// 発行順と ULID の順序が一致します。
pub struct UlidGenerator<C> {
    clock: C,
    generator: Mutex<Generator>,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            generator: Mutex::new(Generator::new()),
        }
    }

    fn next(&self) -> Ulid {
        let now = self.clock.now();
        let mut generator = self
            .generator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match generator.generate_from_datetime(SystemTime::from(now)) {
            Ok(ulid) => ulid,
            // ランダム部分が溢れた場合のみ。順序は保証されないが一意性は保たれる
            Err(_) => Ulid::from_parts(now.timestamp_millis() as u64, rand::random()),
        }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_column_id(&self) -> ColumnId {
        ColumnId::from(self.next())
    }

    fn generate_task_id(&self) -> TaskId {
        TaskId::from(self.next())
    }

    fn generate_comment_id(&self) -> CommentId {
        CommentId::from(self.next())
    }

    fn generate_session_id(&self) -> SessionId {
        SessionId::from(self.next())
    }
}
