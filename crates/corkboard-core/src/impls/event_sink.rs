//! EventSink の実装
//!
//! - **TracingEventSink**: 通知をログに流す（CLI・デフォルト）
//! - **MemoryEventSink**: 通知を溜めておく（テスト用）

use std::sync::Mutex;

use crate::domain::Notice;
use crate::ports::EventSink;

/// Logs every notice; failures at `warn`, everything else at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, notice: Notice) {
        if notice.is_failure() {
            tracing::warn!(notice = %notice, "notice");
        } else {
            tracing::info!(notice = %notice, "notice");
        }
    }
}

/// Collects notices in emission order.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last()
            .cloned()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemoryEventSink::new();
        sink.emit(Notice::NothingToUndo);
        sink.emit(Notice::Rejected("Task title cannot be empty.".into()));

        assert_eq!(
            sink.notices(),
            vec![
                Notice::NothingToUndo,
                Notice::Rejected("Task title cannot be empty.".into())
            ]
        );
        assert_eq!(sink.last(), Some(Notice::Rejected("Task title cannot be empty.".into())));
    }
}
