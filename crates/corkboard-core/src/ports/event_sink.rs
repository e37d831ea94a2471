//! EventSink port - ユーザー向け通知の出口
//!
//! # 実装
//! - TracingEventSink: `tracing` に流すだけ（CLI・ヘッドレス用）
//! - MemoryEventSink: 受け取った Notice を保持（テスト用）
//! - 将来: UI のトースト表示など

use crate::domain::events::Notice;

/// EventSink は Notice を受け取る
///
/// 同期呼び出し。重い処理はしないこと（ミューテーションの直後に呼ばれる）。
pub trait EventSink: Send + Sync {
    fn emit(&self, notice: Notice);
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn emit(&self, notice: Notice) {
        (**self).emit(notice)
    }
}
