//! ClientBuilder - クライアントの構築とワイヤリング
//!
//! # 検証する項目
//! - board / users のキーパスが正しい形式で、互いに重ならないこと
//! - プレゼンスの鮮度ウィンドウが 0 より長く、chrono で表現できること
//! - 履歴の上限を指定する場合は 1 以上であること
//!
//! 時計・ID 生成器・通知先は省略時にデフォルト実装が入ります。

use std::sync::Arc;

use crate::app::client::BoardClient;
use crate::app::presence::PresenceTracker;
use crate::app::sync::RemoteMirror;
use crate::config::SyncConfig;
use crate::domain::BuildError;
use crate::impls::TracingEventSink;
use crate::ports::{Clock, EventSink, IdGenerator, RemoteStore, StorePath, SystemClock, UlidGenerator};

/// ClientBuilder は BoardClient を構築
///
/// # 使用例
/// ```ignore
/// let mut client = ClientBuilder::new(store)
///     .config(SyncConfig::from_env())
///     .build()?;
/// client.connect().await?;
/// ```
///
/// build() が失敗した場合、リモートには何も書き込まれません。
pub struct ClientBuilder {
    store: Arc<dyn RemoteStore>,
    config: SyncConfig,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl ClientBuilder {
    /// 新しい ClientBuilder を作成（設定はデフォルト）
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            config: SyncConfig::default(),
            clock: None,
            ids: None,
            sink: None,
        }
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// 時計を差し替える（デフォルト: SystemClock）
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// ID 生成器を差し替える（デフォルト: 時計を共有する UlidGenerator）
    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// 通知先を差し替える（デフォルト: TracingEventSink）
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 設定を検証して BoardClient を生成
    ///
    /// 生成されたクライアントはまだ購読していません。`connect()` で同期を開始します。
    pub fn build(self) -> Result<BoardClient, BuildError> {
        let board_path = parse_path("board", &self.config.board_path)?;
        let users_path = parse_path("users", &self.config.users_path)?;
        if board_path.overlaps(&users_path) {
            return Err(BuildError::OverlappingPaths {
                board: board_path.to_string(),
                users: users_path.to_string(),
            });
        }
        if self.config.presence_window.is_zero() {
            return Err(BuildError::ZeroPresenceWindow);
        }
        let window = chrono::Duration::from_std(self.config.presence_window)
            .map_err(|_| BuildError::PresenceWindowTooLarge)?;
        if self.config.history_limit == Some(0) {
            return Err(BuildError::ZeroHistoryLimit);
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingEventSink));
        let session = ids.generate_session_id();

        let mirror = RemoteMirror::new(Arc::clone(&self.store), board_path);
        let presence = PresenceTracker::new(self.store, users_path, session, Arc::clone(&clock), window);

        Ok(BoardClient::new(
            mirror,
            presence,
            clock,
            ids,
            sink,
            self.config.history_limit,
        ))
    }
}

fn parse_path(name: &'static str, path: &str) -> Result<StorePath, BuildError> {
    StorePath::parse(path).map_err(|_| BuildError::InvalidPath {
        name,
        path: path.to_string(),
    })
}
