use std::time::Duration;
use thiserror::Error;

use crate::stomp::StompError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("event stream error: {0}")]
    EventStream(String),
    #[error("server reported an error: {0}")]
    Protocol(String),
    #[error("unexpected {0} frame")]
    UnexpectedFrame(String),
    #[error(transparent)]
    Frame(#[from] StompError),
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("no data from server within {0:?}")]
    HeartbeatTimeout(Duration),
    #[error("connection closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("identity store is corrupt: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("identity store lock poisoned")]
    Poisoned,
}
