//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryRemoteStore**: 開発・テスト用のキーパス・ツリーストア
//! - **TracingEventSink**: 通知をログに流す
//! - **MemoryEventSink**: テスト用に通知を溜める
//!
//! # 本番用実装
//! ホスト型のリアルタイム DB へのアダプタは別クレートに配置する想定です。

pub mod event_sink;
pub mod inmem_store;

// 主要な型を再エクスポート
pub use self::event_sink::{MemoryEventSink, TracingEventSink};
pub use self::inmem_store::InMemoryRemoteStore;
