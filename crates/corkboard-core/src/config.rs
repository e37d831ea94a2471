//! SyncConfig - 同期クライアントの設定
//!
//! 環境変数から読み込み、未設定・不正な値はデフォルトに戻します（`warn!` を出す）。

use std::str::FromStr;
use std::time::Duration;

/// Synchronizer configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Root key path of the shared board (default: `board`).
    pub board_path: String,
    /// Root key path of the presence collection (default: `users`).
    pub users_path: String,
    /// Presence records older than this are not reported as active (default: 5 minutes).
    pub presence_window: Duration,
    /// Maximum number of undo snapshots kept; `None` keeps everything.
    pub history_limit: Option<usize>,
    /// Buffer size of each subscription channel (default: `256`).
    pub channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            board_path: "board".into(),
            users_path: "users".into(),
            presence_window: Duration::from_secs(300),
            history_limit: None,
            channel_capacity: 256,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default     |
    /// |----------------------------------|-------------|
    /// | `CORKBOARD_BOARD_PATH`           | `board`     |
    /// | `CORKBOARD_USERS_PATH`           | `users`     |
    /// | `CORKBOARD_PRESENCE_WINDOW_SECS` | `300`       |
    /// | `CORKBOARD_HISTORY_LIMIT`        | unset       |
    /// | `CORKBOARD_CHANNEL_CAPACITY`     | `256`       |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SyncConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let board_path = lookup("CORKBOARD_BOARD_PATH")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.board_path);

        let users_path = lookup("CORKBOARD_USERS_PATH")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.users_path);

        let presence_window = parse_or("CORKBOARD_PRESENCE_WINDOW_SECS", &lookup)
            .map(Duration::from_secs)
            .unwrap_or(defaults.presence_window);

        let history_limit = parse_or::<usize>("CORKBOARD_HISTORY_LIMIT", &lookup);

        let channel_capacity =
            parse_or("CORKBOARD_CHANNEL_CAPACITY", &lookup).unwrap_or(defaults.channel_capacity);

        Self {
            board_path,
            users_path,
            presence_window,
            history_limit,
            channel_capacity,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, lookup: &impl Fn(&str) -> Option<String>) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring invalid configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = SyncConfig::from_lookup(|_| None);
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.presence_window, Duration::from_secs(300));
        assert_eq!(config.history_limit, None);
    }

    #[test]
    fn reads_every_variable() {
        let config = SyncConfig::from_lookup(lookup_from(&[
            ("CORKBOARD_BOARD_PATH", "boards/team-a"),
            ("CORKBOARD_USERS_PATH", "presence"),
            ("CORKBOARD_PRESENCE_WINDOW_SECS", "60"),
            ("CORKBOARD_HISTORY_LIMIT", "50"),
            ("CORKBOARD_CHANNEL_CAPACITY", "16"),
        ]));

        assert_eq!(config.board_path, "boards/team-a");
        assert_eq!(config.users_path, "presence");
        assert_eq!(config.presence_window, Duration::from_secs(60));
        assert_eq!(config.history_limit, Some(50));
        assert_eq!(config.channel_capacity, 16);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = SyncConfig::from_lookup(lookup_from(&[
            ("CORKBOARD_PRESENCE_WINDOW_SECS", "five minutes"),
            ("CORKBOARD_HISTORY_LIMIT", "-1"),
            ("CORKBOARD_BOARD_PATH", "   "),
        ]));

        assert_eq!(config, SyncConfig::default());
    }
}
