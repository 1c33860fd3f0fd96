use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Lifecycle of a streaming connection as seen by the view.
///
/// Only the task that owns the transport ever writes this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
    ErrorBackoff,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::ErrorBackoff => "waiting to reconnect",
        };
        f.write_str(label)
    }
}
