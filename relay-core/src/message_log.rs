use relay_types::{MessageKind, SystemMessage};
use serde::Serialize;
use std::collections::VecDeque;

pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Append-only log of system and user messages, capped to the most recent
/// `capacity` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageLog {
    entries: VecDeque<SystemMessage>,
    #[serde(skip)]
    capacity: usize,
    #[serde(skip)]
    total: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            total: 0,
        }
    }

    pub fn push(&mut self, text: impl Into<String>, kind: MessageKind) {
        self.entries.push_back(SystemMessage {
            text: text.into(),
            kind,
            at: chrono::Utc::now().to_rfc3339(),
        });
        self.total += 1;

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn system(&mut self, text: impl Into<String>) {
        self.push(text, MessageKind::System);
    }

    pub fn user(&mut self, text: impl Into<String>) {
        self.push(text, MessageKind::User);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&SystemMessage> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SystemMessage> {
        self.entries.iter()
    }

    /// Number of messages ever appended, including evicted ones. Lets a
    /// renderer find the entries it has not shown yet.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Messages appended after the first `seen` ones, limited to what is
    /// still retained.
    pub fn since(&self, seen: u64) -> impl Iterator<Item = &SystemMessage> {
        let unseen = self.total.saturating_sub(seen).min(self.entries.len() as u64) as usize;
        self.entries.iter().skip(self.entries.len() - unseen)
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_order_and_kind() {
        let mut log = MessageLog::new();
        log.system("welcome");
        log.user("Input: 사자");

        let entries: Vec<_> = log.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "welcome");
        assert_eq!(entries[0].kind, MessageKind::System);
        assert_eq!(entries[1].kind, MessageKind::User);
        assert!(chrono::DateTime::parse_from_rfc3339(&entries[1].at).is_ok());
    }

    #[test]
    fn test_capacity_keeps_most_recent() {
        let mut log = MessageLog::with_capacity(3);
        for i in 0..5 {
            log.system(format!("m{}", i));
        }

        let texts: Vec<_> = log.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
        assert_eq!(log.total(), 5);
    }

    #[test]
    fn test_since_returns_unseen_entries() {
        let mut log = MessageLog::with_capacity(3);
        log.system("a");
        log.system("b");
        let seen = log.total();
        log.system("c");

        let unseen: Vec<_> = log.since(seen).map(|m| m.text.as_str()).collect();
        assert_eq!(unseen, vec!["c"]);

        // More unseen than retained: only what is left is returned.
        for t in ["d", "e", "f", "g"] {
            log.system(t);
        }
        let unseen: Vec<_> = log.since(seen).map(|m| m.text.as_str()).collect();
        assert_eq!(unseen, vec!["e", "f", "g"]);

        assert_eq!(log.since(log.total()).count(), 0);
    }
}
