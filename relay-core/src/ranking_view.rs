use relay_types::{ConnectionState, RankingSnapshot, ranking::deserialize_score};
use serde::Serialize;
use std::time::Duration;

pub const STREAM_LOST_ERROR: &str = "ranking updates connection lost";
pub const STREAM_STOPPED_ERROR: &str = "ranking updates stopped; reconnect manually";

/// Ranking state exposed to the view. Every snapshot replaces the previous
/// one; a bad payload never clears what is already shown.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RankingView {
    pub connection: ConnectionState,
    pub rankings: RankingSnapshot,
    pub own_score: Option<u64>,
    pub error: Option<String>,
    pub reconnect_attempts: u32,
    pub next_retry: Option<Duration>,
}

impl RankingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connecting(&mut self) {
        self.connection = ConnectionState::Connecting;
        self.next_retry = None;
    }

    pub fn on_open(&mut self) {
        self.connection = ConnectionState::Connected;
        self.error = None;
        self.reconnect_attempts = 0;
        self.next_retry = None;
    }

    pub fn on_rankings(&mut self, body: &str) -> Result<(), serde_json::Error> {
        self.rankings = serde_json::from_str(body)?;
        Ok(())
    }

    pub fn on_score(&mut self, body: &str) -> Result<(), serde_json::Error> {
        let mut deserializer = serde_json::Deserializer::from_str(body.trim());
        let score = deserialize_score(&mut deserializer)?;
        deserializer.end()?;
        self.own_score = Some(score);
        Ok(())
    }

    pub fn on_transport_error(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.error = Some(STREAM_LOST_ERROR.to_string());
    }

    pub fn on_backoff(&mut self, attempt: u32, delay: Duration) {
        self.connection = ConnectionState::ErrorBackoff;
        self.reconnect_attempts = attempt;
        self.next_retry = Some(delay);
    }

    pub fn on_exhausted(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.error = Some(STREAM_STOPPED_ERROR.to_string());
        self.next_retry = None;
    }
}
