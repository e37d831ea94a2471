//! corkboard-core
//!
//! Core building blocks for a collaborative kanban board: a local board
//! mirror with undo/redo that stays in step with a shared key-path store.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, board, mutation, engine, history, errors, events, drag）
//! - **ports**: 抽象化レイヤー（RemoteStore, Clock, IdGenerator, EventSink）
//! - **app**: アプリケーションロジック（builder, client, sync, presence, status）
//! - **impls**: 実装（InMemoryRemoteStore など開発・テスト用）
//! - **config**: 環境変数からの設定読み込み

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use self::app::{BoardClient, ClientBuilder};
pub use self::config::SyncConfig;
pub use self::domain::{CorkboardError, Mutation, Notice};
