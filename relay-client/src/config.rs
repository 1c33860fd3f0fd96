use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::identity::FileStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub game_socket_url: String,
    pub ranking_stream_url: String,
    pub presence_url: String,
    /// `None` when no data directory could be found; the identity is then
    /// regenerated every run.
    pub browser_id_path: Option<PathBuf>,
    pub game_reconnect_delay: Duration,
    pub stomp_heartbeat: Duration,
    pub presence_poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            game_socket_url: lookup("GAME_SOCKET_URL")
                .unwrap_or_else(|| "ws://127.0.0.1:8080/ws/game/websocket".to_string()),
            ranking_stream_url: lookup("RANKING_STREAM_URL")
                .unwrap_or_else(|| "http://127.0.0.1:8080/sse/connect".to_string()),
            presence_url: lookup("PRESENCE_URL")
                .unwrap_or_else(|| "http://127.0.0.1:3000/presence".to_string()),
            browser_id_path: lookup("BROWSER_ID_PATH")
                .map(PathBuf::from)
                .or_else(FileStore::default_path),
            game_reconnect_delay: Duration::from_millis(parse_var(
                &lookup,
                "GAME_RECONNECT_DELAY_MS",
                5000,
            )?),
            stomp_heartbeat: Duration::from_millis(parse_var(&lookup, "STOMP_HEARTBEAT_MS", 4000)?),
            presence_poll_interval: parse_period(&lookup, "PRESENCE_POLL_SECONDS", 5)?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Whole seconds used as a timer period, which must be non-zero.
fn parse_period<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var(lookup, key, default)? {
        0 => Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}
