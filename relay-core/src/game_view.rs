use relay_types::{BroadcastMessage, ConnectionState, UserInfo};
use serde::Serialize;

use crate::message_log::{DEFAULT_LOG_CAPACITY, MessageLog};
use crate::word_chain::{DEFAULT_CHAIN_CAPACITY, WordChain};

pub const DISCONNECTED_ERROR: &str = "Disconnected from the server.";
pub const CONNECTION_LOST_ERROR: &str = "Connection lost; reconnecting";

/// Everything the view renders for the game channel.
///
/// Mutated only by the task that owns the game connection, in response to
/// transport events and local submissions.
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    pub connection: ConnectionState,
    pub words: WordChain,
    pub user: Option<UserInfo>,
    pub error: Option<String>,
    pub messages: MessageLog,
    /// Set when `error` came from the transport rather than the server, so a
    /// successful reconnect can clear it.
    #[serde(skip)]
    transient_error: bool,
}

impl GameView {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CHAIN_CAPACITY, DEFAULT_LOG_CAPACITY)
    }

    pub fn with_limits(chain_capacity: usize, log_capacity: usize) -> Self {
        Self {
            connection: ConnectionState::Connecting,
            words: WordChain::with_capacity(chain_capacity),
            user: None,
            error: None,
            messages: MessageLog::with_capacity(log_capacity),
            transient_error: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn set_connection(&mut self, state: ConnectionState) {
        self.connection = state;
        if state == ConnectionState::Connected && self.transient_error {
            self.error = None;
            self.transient_error = false;
        }
    }

    /// Private welcome payload `{nickname, score}`.
    pub fn on_welcome(&mut self, body: &str) -> Result<(), serde_json::Error> {
        let info: UserInfo = serde_json::from_str(body)?;
        self.messages.system(format!(
            "Joined the game. Welcome, {}!",
            info.nickname
        ));
        self.user = Some(info);
        Ok(())
    }

    /// Shared broadcast payload `{message, words?}`. A present `words` list
    /// replaces the chain as-is.
    pub fn on_broadcast(&mut self, body: &str) -> Result<(), serde_json::Error> {
        let broadcast: BroadcastMessage = serde_json::from_str(body)?;
        self.messages.system(broadcast.message);
        if let Some(words) = broadcast.words {
            self.words.replace(words);
        }
        Ok(())
    }

    /// Plain-text error pushed by the server on the private error channel.
    pub fn on_server_error(&mut self, body: &str) {
        self.set_error(body.to_string(), false);
        self.messages.system(format!("Error: {}", body));
    }

    /// Protocol-level `ERROR` frame; the connection is unusable afterwards.
    /// The error outlives the reconnect that follows.
    pub fn on_protocol_error(&mut self, message: Option<&str>) {
        let text = format!("Connection error: {}", message.unwrap_or("unknown"));
        self.messages.system(text.clone());
        self.set_error(text, false);
        self.connection = ConnectionState::Disconnected;
    }

    pub fn on_connection_lost(&mut self) {
        self.set_error(CONNECTION_LOST_ERROR.to_string(), true);
        self.connection = ConnectionState::Disconnected;
    }

    /// Echo of a word that was handed to the server.
    pub fn on_submitted(&mut self, word: &str) {
        self.messages.user(format!("Input: {}", word));
    }

    /// Submission attempted while not connected.
    pub fn on_offline_submit(&mut self) {
        self.set_error(DISCONNECTED_ERROR.to_string(), false);
        self.messages.system(DISCONNECTED_ERROR);
    }

    fn set_error(&mut self, text: String, transient: bool) {
        self.error = Some(text);
        self.transient_error = transient;
    }
}

impl Default for GameView {
    fn default() -> Self {
        Self::new()
    }
}
