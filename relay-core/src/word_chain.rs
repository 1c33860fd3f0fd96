use serde::Serialize;
use std::collections::VecDeque;
use thiserror::Error;

use crate::word_validation::is_valid_word;

pub const START_WORD: &str = "시작";
pub const DEFAULT_CHAIN_CAPACITY: usize = 100;
pub const DISPLAY_WIDTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Invalid word, try again.")]
    InvalidWord { previous: String, candidate: String },
}

/// Ordered word history, oldest first.
///
/// Locally appended words must continue the chain; server pushes replace it
/// wholesale and are trusted. Only the most recent `capacity` words are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordChain {
    words: VecDeque<String>,
    #[serde(skip)]
    capacity: usize,
}

impl WordChain {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHAIN_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut chain = Self {
            words: VecDeque::new(),
            capacity: capacity.max(1),
        };
        chain.words.push_back(START_WORD.to_string());
        chain
    }

    pub fn last(&self) -> Option<&str> {
        self.words.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    /// Optimistic append, gated by the word-chain rule.
    pub fn try_append(&mut self, candidate: &str) -> Result<(), ChainError> {
        let previous = self.last().unwrap_or_default();
        if !is_valid_word(previous, candidate) {
            return Err(ChainError::InvalidWord {
                previous: previous.to_string(),
                candidate: candidate.to_string(),
            });
        }

        self.push(candidate.to_string());
        Ok(())
    }

    /// Replace the whole chain with a server-pushed one. Not validated.
    pub fn replace(&mut self, words: Vec<String>) {
        self.words = words.into();
        self.evict();
    }

    /// The last `width` words, left-padded with empty strings so the result
    /// always has exactly `width` entries.
    pub fn display_window(&self, width: usize) -> Vec<String> {
        let shown = self.words.len().min(width);
        let mut window = vec![String::new(); width - shown];
        window.extend(self.words.iter().skip(self.words.len() - shown).cloned());
        window
    }

    fn push(&mut self, word: String) {
        self.words.push_back(word);
        self.evict();
    }

    fn evict(&mut self) {
        while self.words.len() > self.capacity {
            self.words.pop_front();
        }
    }
}

impl Default for WordChain {
    fn default() -> Self {
        Self::new()
    }
}
