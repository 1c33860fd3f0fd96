use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::BrowserId;

/// Sent once to the application `connect` destination right after the
/// connection opens, so the server can re-identify the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ConnectMessage {
    pub browser_id: BrowserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SubmitWordMessage {
    pub session_id: String,
    pub word: String,
}

/// Shared broadcast payload. `words`, when present, is the authoritative chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BroadcastMessage {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SystemMessage {
    pub text: String,
    pub kind: MessageKind,
    pub at: String, // RFC 3339 string
}
