//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（リアルタイム DB、時計、ID 発行、通知先）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - リモートのツリーストアが source of truth（正本）
//! - ローカル状態はその鏡像で、受信のたびに丸ごと置き換わる

pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod remote_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::remote_store::{RemoteStore, StoreError, StorePath, Subscription};
