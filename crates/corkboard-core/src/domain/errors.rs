//! Errors - エラー型と分類
//!
//! # 分類
//! - Validation: 入力エラー（ミューテーション前に検出、副作用なし）
//! - Remote: リモートストアへの書き込み・読み込み失敗（ローカルはロールバックしない）
//! - Internal: デコード失敗、構築時の設定ミスなど

use crate::ports::remote_store::StoreError;

use super::drag::DragError;

/// ErrorKind はエラーの運用分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Remote,
    Internal,
}

/// 必須フィールドの種類（ユーザー向けメッセージの切り替えに使う）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ColumnTitle,
    TaskTitle,
    CommentText,
}

/// ValidationError はローカル専用の入力ガード
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{}", empty_message(.0))]
    Empty(Field),
}

fn empty_message(field: &Field) -> &'static str {
    match field {
        Field::ColumnTitle => "Column title cannot be empty.",
        Field::TaskTitle => "Task title cannot be empty.",
        Field::CommentText => "Comment cannot be empty.",
    }
}

/// Reject values that are empty after trimming whitespace.
pub fn require_non_blank(value: &str, field: Field) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}

/// BuildError はクライアント構築時の設定エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid {name} path {path:?}. Use slash-separated keys without . # $ [ ]")]
    InvalidPath { name: &'static str, path: String },

    #[error("Board path {board:?} and users path {users:?} overlap")]
    OverlappingPaths { board: String, users: String },

    #[error("Presence window must be longer than zero")]
    ZeroPresenceWindow,

    #[error("Presence window is too large")]
    PresenceWindowTooLarge,

    #[error("History limit must be at least 1. Leave it unset for unbounded history")]
    ZeroHistoryLimit,
}

/// CorkboardError はクレート全体のエラー
#[derive(Debug, thiserror::Error)]
pub enum CorkboardError {
    #[error("rejected input: {0}")]
    Validation(#[from] ValidationError),

    #[error("remote store: {0}")]
    Remote(#[from] StoreError),

    #[error("unusable drag event: {0}")]
    Drag(#[from] DragError),

    #[error("failed to decode remote payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid client configuration: {0}")]
    Build(#[from] BuildError),
}

impl CorkboardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CorkboardError::Validation(_) | CorkboardError::Drag(_) => ErrorKind::Validation,
            CorkboardError::Remote(_) => ErrorKind::Remote,
            CorkboardError::Decode(_) | CorkboardError::Build(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_rejected() {
        assert_eq!(
            require_non_blank("   \t", Field::ColumnTitle),
            Err(ValidationError::Empty(Field::ColumnTitle))
        );
        assert!(require_non_blank("  To Do ", Field::ColumnTitle).is_ok());
    }

    #[test]
    fn messages_match_field() {
        assert_eq!(
            ValidationError::Empty(Field::TaskTitle).to_string(),
            "Task title cannot be empty."
        );
        assert_eq!(
            ValidationError::Empty(Field::CommentText).to_string(),
            "Comment cannot be empty."
        );
    }

    #[test]
    fn kinds_are_classified() {
        let err = CorkboardError::from(ValidationError::Empty(Field::TaskTitle));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = CorkboardError::from(StoreError::Unavailable);
        assert_eq!(err.kind(), ErrorKind::Remote);

        let err = CorkboardError::from(DragError::UnknownDroppable("board".into()));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = CorkboardError::from(BuildError::ZeroPresenceWindow);
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
