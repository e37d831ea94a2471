//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **ClientBuilder**: クライアントの構築とワイヤリング（起動時検証）
//! - **BoardClient**: ミューテーション・Undo/Redo・ドラッグ操作の表面
//! - **RemoteMirror**: ローカル状態とリモートツリーの同期
//! - **PresenceTracker**: 接続中のセッションと直近の操作
//! - **BoardStatus**: ボードと履歴の概況

pub mod builder;
pub mod client;
pub mod presence;
pub mod status;
pub mod sync;

// 主要な型を再エクスポート
pub use self::builder::ClientBuilder;
pub use crate::domain::BuildError;
pub use self::client::{BoardClient, HistoryReport, MutationReport, RemoteStatus};
pub use self::presence::{PresenceRecord, PresenceTracker};
pub use self::status::BoardStatus;
pub use self::sync::RemoteMirror;
