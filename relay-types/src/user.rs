use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::ranking::deserialize_score;

/// Per-browser random identifier used to correlate sessions without a login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BrowserId(pub String);

impl BrowserId {
    /// Generate a fresh UUID v4 shaped identifier (36 chars, fixed version
    /// and variant nibbles).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BrowserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BrowserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Delivered once per connection on the private welcome channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserInfo {
    pub nickname: String,
    #[serde(deserialize_with = "deserialize_score")]
    #[ts(type = "number")]
    pub score: u64,
}
