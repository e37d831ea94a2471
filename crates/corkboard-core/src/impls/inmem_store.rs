//! InMemoryRemoteStore - 開発・テスト用のツリーストア
//!
//! # 学習ポイント
//! - `serde_json::Value` のツリーをキーパスで読み書き
//! - `tokio::sync::broadcast` によるパス単位の購読
//! - 障害注入（オフライン、次の N 回の書き込みを拒否）
//!
//! 本番のリアルタイム DB と同じく、空の配列・マップ・null は保存しません。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, broadcast};

use crate::domain::ids::SessionId;
use crate::ports::{RemoteStore, StoreError, StorePath, Subscription};

/// Default buffer capacity for each subscription channel.
const DEFAULT_CAPACITY: usize = 256;

struct Subscriber {
    path: StorePath,
    sender: broadcast::Sender<Option<Value>>,
}

struct StoreState {
    root: Value,
    subscribers: Vec<Subscriber>,
    on_disconnect: HashMap<SessionId, Vec<StorePath>>,
    offline: bool,
    reject_writes: usize,
    writes: usize,
}

impl StoreState {
    fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
            subscribers: Vec::new(),
            on_disconnect: HashMap::new(),
            offline: false,
            reject_writes: 0,
            writes: 0,
        }
    }

    fn value_at(&self, path: &StorePath) -> Option<Value> {
        let mut node = &self.root;
        for segment in path.segments() {
            node = child(node, segment)?;
        }
        Some(node.clone())
    }

    /// Fail-fast checks shared by every write.
    fn admit_write(&mut self, path: &StorePath) -> Result<(), StoreError> {
        if self.offline {
            return Err(StoreError::Unavailable);
        }
        if self.reject_writes > 0 {
            self.reject_writes -= 1;
            return Err(StoreError::Rejected {
                path: path.to_string(),
                reason: "write rejected by store".to_string(),
            });
        }
        self.writes += 1;
        Ok(())
    }

    fn write(&mut self, path: &StorePath, value: Value) {
        write_at(&mut self.root, path.segments(), prune(value));
    }

    /// Push the new value of every subscribed path that overlaps `written`.
    fn notify(&mut self, written: &StorePath) {
        self.subscribers
            .retain(|subscriber| subscriber.sender.receiver_count() > 0);
        for subscriber in &self.subscribers {
            if subscriber.path.overlaps(written) {
                let mut node = Some(&self.root);
                for segment in subscriber.path.segments() {
                    node = node.and_then(|n| child(n, segment));
                }
                // 受信者がいなくなった直後の送信失敗は無視してよい
                let _ = subscriber.sender.send(node.cloned());
            }
        }
    }
}

fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Drop nulls and empty containers, as the hosted store does.
fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !is_absent(v))
                .collect();
            Value::Object(map)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(prune).collect()),
        other => other,
    }
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Write (or remove, when `value` is absent) at `segments` under `node`,
/// then drop any ancestor left empty. Returns true if `node` itself became empty.
fn write_at(node: &mut Value, segments: &[String], value: Value) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return is_absent(node);
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return false;
    };

    if rest.is_empty() {
        if is_absent(&value) {
            map.remove(head);
        } else {
            map.insert(head.clone(), value);
        }
    } else {
        if is_absent(&value) && !map.contains_key(head) {
            return map.is_empty();
        }
        let entry = map
            .entry(head.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if write_at(entry, rest, value) {
            map.remove(head);
        }
    }
    map.is_empty()
}

/// In-memory key-path tree store with last-write-wins semantics.
///
/// # 使用例
/// ```ignore
/// let store = InMemoryRemoteStore::new();
/// let path = StorePath::parse("board/columnOrder")?;
/// store.set(&path, serde_json::json!(["a", "b"])).await?;
/// let mut sub = store.subscribe(&path).await?;
/// ```
pub struct InMemoryRemoteStore {
    state: Arc<Mutex<StoreState>>,
    capacity: usize,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::new())),
            capacity: capacity.max(1),
        }
    }

    /// Simulate losing (or regaining) the network. Reads and writes fail while offline.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Reject the next `count` writes.
    pub async fn reject_next_writes(&self, count: usize) {
        self.state.lock().await.reject_writes = count;
    }

    /// Number of accepted writes so far.
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.writes
    }

    /// The whole tree, for assertions and debugging.
    pub async fn dump(&self) -> Value {
        self.state.lock().await.root.clone()
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let state = self.state.lock().await;
        if state.offline {
            return Err(StoreError::Unavailable);
        }
        Ok(state.value_at(path))
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.admit_write(path)?;
        state.write(path, value);
        state.notify(path);
        Ok(())
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        // キーはパスの相対指定として扱う（"a/b" も可）
        let targets = fields
            .into_iter()
            .map(|(key, value)| {
                let relative = StorePath::parse(&key)?;
                let target = relative
                    .segments()
                    .iter()
                    .fold(path.clone(), |acc, segment| acc.child(segment.as_str()));
                Ok((target, value))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        state.admit_write(path)?;
        for (target, value) in targets {
            state.write(&target, value);
        }
        state.notify(path);
        Ok(())
    }

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.admit_write(path)?;
        state.write(path, Value::Null);
        state.notify(path);
        Ok(())
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError> {
        let mut state = self.state.lock().await;
        let (sender, receiver) = broadcast::channel(self.capacity);
        let initial = state.value_at(path);
        state.subscribers.push(Subscriber {
            path: path.clone(),
            sender,
        });
        Ok(Subscription::new(path.clone(), initial, receiver))
    }

    async fn on_disconnect_remove(
        &self,
        session: SessionId,
        path: &StorePath,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.offline {
            return Err(StoreError::Unavailable);
        }
        state
            .on_disconnect
            .entry(session)
            .or_default()
            .push(path.clone());
        Ok(())
    }

    async fn disconnect(&self, session: SessionId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        // サーバー側で実行される想定なので、オフラインでも実行する
        for path in state.on_disconnect.remove(&session).unwrap_or_default() {
            state.write(&path, Value::Null);
            state.notify(&path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ulid::Ulid;

    fn path(s: &str) -> StorePath {
        StorePath::parse(s).unwrap()
    }

    #[tokio::test]
    async fn set_then_get_at_any_depth() {
        let store = InMemoryRemoteStore::new();
        store
            .set(&path("board/columns/a"), json!({"id": "a", "title": "To Do"}))
            .await
            .unwrap();

        assert_eq!(
            store.get(&path("board/columns/a/title")).await.unwrap(),
            Some(json!("To Do"))
        );
        assert_eq!(
            store.get(&path("board")).await.unwrap(),
            Some(json!({"columns": {"a": {"id": "a", "title": "To Do"}}}))
        );
        assert_eq!(store.get(&path("users")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_merges_and_set_overwrites() {
        let store = InMemoryRemoteStore::new();
        let column = path("board/columns/a");
        store
            .set(&column, json!({"id": "a", "title": "To Do", "taskIds": ["t1"]}))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("title".into(), json!("Doing"));
        store.update(&column, fields).await.unwrap();
        assert_eq!(
            store.get(&column).await.unwrap(),
            Some(json!({"id": "a", "title": "Doing", "taskIds": ["t1"]}))
        );

        store.set(&column, json!({"id": "a"})).await.unwrap();
        assert_eq!(store.get(&column).await.unwrap(), Some(json!({"id": "a"})));
    }

    #[tokio::test]
    async fn empty_values_are_not_stored() {
        let store = InMemoryRemoteStore::new();
        store
            .set(&path("board/columns/a"), json!({"id": "a", "taskIds": []}))
            .await
            .unwrap();
        assert_eq!(
            store.get(&path("board/columns/a")).await.unwrap(),
            Some(json!({"id": "a"}))
        );

        store.remove(&path("board/columns/a")).await.unwrap();
        // 空になった祖先も消える
        assert_eq!(store.get(&path("board")).await.unwrap(), None);
        assert_eq!(store.dump().await, json!({}));
    }

    #[tokio::test]
    async fn subscribers_see_initial_value_and_overlapping_writes() {
        let store = InMemoryRemoteStore::new();
        store.set(&path("board/columnOrder"), json!(["a"])).await.unwrap();

        let mut board = store.subscribe(&path("board")).await.unwrap();
        let mut users = store.subscribe(&path("users")).await.unwrap();
        assert_eq!(board.next().await, Some(Some(json!({"columnOrder": ["a"]}))));
        assert_eq!(users.next().await, Some(None));

        store.set(&path("board/columnOrder"), json!(["a", "b"])).await.unwrap();
        assert_eq!(
            board.next().await,
            Some(Some(json!({"columnOrder": ["a", "b"]})))
        );

        // users は board への書き込みを受け取らない
        let pending = tokio::time::timeout(std::time::Duration::from_millis(50), users.next()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn offline_and_rejected_writes_fail_without_changing_state() {
        let store = InMemoryRemoteStore::new();
        store.set_offline(true).await;
        assert_eq!(
            store.set(&path("board/x"), json!(1)).await,
            Err(StoreError::Unavailable)
        );
        store.set_offline(false).await;

        store.reject_next_writes(1).await;
        assert!(matches!(
            store.set(&path("board/x"), json!(1)).await,
            Err(StoreError::Rejected { .. })
        ));
        store.set(&path("board/x"), json!(2)).await.unwrap();

        assert_eq!(store.get(&path("board/x")).await.unwrap(), Some(json!(2)));
        assert_eq!(store.write_count().await, 1);
    }

    #[tokio::test]
    async fn disconnect_runs_registered_removals() {
        let store = InMemoryRemoteStore::new();
        let session = SessionId::from_ulid(Ulid::new());
        let presence = path("users").child(session.key());
        store
            .set(&presence, json!({"connected": true}))
            .await
            .unwrap();
        store.on_disconnect_remove(session, &presence).await.unwrap();

        let mut users = store.subscribe(&path("users")).await.unwrap();
        assert!(users.next().await.unwrap().is_some());

        store.disconnect(session).await.unwrap();
        assert_eq!(users.next().await, Some(None));
        assert_eq!(store.get(&presence).await.unwrap(), None);
    }
}
