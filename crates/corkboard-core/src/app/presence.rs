//! PresenceTracker - 誰が接続中で、最後に何をしたか
//!
//! `users/{sessionId}` に `{connected, timestamp, userId, action?}` を書き、
//! 切断時に削除されるよう登録します。一覧は購読で受け取り、
//! 読み出し時に鮮度ウィンドウ（デフォルト 5 分）で絞り込みます。
//!
//! 表示用の参考情報であり、ボードの一貫性には関与しません。

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::domain::SessionId;
use crate::ports::{Clock, RemoteStore, StoreError, StorePath};

/// One session's presence record as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub connected: bool,
    /// Milliseconds since the Unix epoch of the session's last write.
    pub timestamp: i64,
    pub user_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl PresenceRecord {
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp)
    }

    /// Connected and seen less than `window` before `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        self.connected
            && self
                .last_seen()
                .is_some_and(|seen| now.signed_duration_since(seen) < window)
    }
}

type Records = Arc<RwLock<BTreeMap<SessionId, PresenceRecord>>>;

pub struct PresenceTracker {
    store: Arc<dyn RemoteStore>,
    users_path: StorePath,
    session: SessionId,
    clock: Arc<dyn Clock>,
    window: chrono::Duration,
    records: Records,
}

impl PresenceTracker {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        users_path: StorePath,
        session: SessionId,
        clock: Arc<dyn Clock>,
        window: chrono::Duration,
    ) -> Self {
        Self {
            store,
            users_path,
            session,
            clock,
            window,
            records: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    fn record_path(&self) -> StorePath {
        self.users_path.child(self.session.key())
    }

    /// Announce this session, arrange its removal on disconnect, and start
    /// following the presence collection.
    ///
    /// The current collection is loaded before this returns.
    pub async fn start(&self) -> Result<JoinHandle<()>, StoreError> {
        let path = self.record_path();
        let record = PresenceRecord {
            connected: true,
            timestamp: self.clock.now().timestamp_millis(),
            user_id: self.session,
            action: None,
        };
        self.store.set(&path, serde_json::to_value(&record)?).await?;
        self.store.on_disconnect_remove(self.session, &path).await?;

        let mut subscription = self.store.subscribe(&self.users_path).await?;
        if let Some(initial) = subscription.next().await {
            store_records(&self.records, initial);
        }

        let records = Arc::clone(&self.records);
        tracing::info!(session = %self.session, "presence registered");
        Ok(tokio::spawn(async move {
            while let Some(value) = subscription.next().await {
                store_records(&records, value);
            }
        }))
    }

    /// Record this session's latest action and refresh its timestamp.
    pub async fn update_action(&self, label: &str) -> Result<(), StoreError> {
        let mut fields = Map::new();
        fields.insert("action".into(), Value::String(label.to_string()));
        fields.insert(
            "timestamp".into(),
            Value::from(self.clock.now().timestamp_millis()),
        );
        fields.insert("connected".into(), Value::Bool(true));
        fields.insert("userId".into(), Value::String(self.session.key()));
        self.store.update(&self.record_path(), fields).await
    }

    /// Sessions that are connected and were seen within the freshness window.
    pub fn active(&self) -> Vec<PresenceRecord> {
        let now = self.clock.now();
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|record| record.is_fresh(now, self.window))
            .cloned()
            .collect()
    }

    /// Drop the connection; the store removes this session's record.
    pub async fn disconnect(&self) -> Result<(), StoreError> {
        self.store.disconnect(self.session).await?;
        tracing::info!(session = %self.session, "presence disconnected");
        Ok(())
    }
}

fn store_records(records: &Records, value: Option<Value>) {
    let decoded = decode_records(value);
    *records
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = decoded;
}

/// Decode the presence collection, skipping entries that are not valid records.
pub fn decode_records(value: Option<Value>) -> BTreeMap<SessionId, PresenceRecord> {
    let Some(Value::Object(entries)) = value else {
        return BTreeMap::new();
    };
    entries
        .into_iter()
        .filter_map(|(key, value)| {
            let Some(session) = SessionId::parse_key(&key) else {
                tracing::debug!(key, "ignoring presence entry with a foreign key");
                return None;
            };
            match serde_json::from_value::<PresenceRecord>(value) {
                Ok(record) => Some((session, record)),
                Err(e) => {
                    tracing::debug!(key, error = %e, "ignoring malformed presence entry");
                    None
                }
            }
        })
        .collect()
}
