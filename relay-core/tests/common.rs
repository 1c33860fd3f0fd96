#![allow(dead_code)]

use relay_core::{GameView, RankingView};
use relay_types::ConnectionState;

/// Broadcast payload carrying a full word list
pub fn broadcast_with_words(message: &str, words: &[&str]) -> String {
    let words: Vec<String> = words.iter().map(|w| format!("\"{}\"", w)).collect();
    format!(r#"{{"message":"{}","words":[{}]}}"#, message, words.join(","))
}

/// Welcome payload for the given nickname
pub fn welcome_payload(nickname: &str, score: u64) -> String {
    format!(r#"{{"nickname":"{}","score":{}}}"#, nickname, score)
}

/// Ranking payload with descending scores
pub fn rankings_payload(names: &[&str]) -> String {
    let entries: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            format!(
                r#"{{"rank":{},"name":"{}","score":{}}}"#,
                i + 1,
                name,
                (names.len() - i) * 10
            )
        })
        .collect();
    format!("[{}]", entries.join(","))
}

/// Game view that has already been welcomed on an open connection
pub fn connected_game_view(nickname: &str) -> GameView {
    let mut view = GameView::new();
    view.set_connection(ConnectionState::Connected);
    view.on_welcome(&welcome_payload(nickname, 0)).unwrap();
    view
}

/// Ranking view holding a first snapshot
pub fn populated_ranking_view(names: &[&str]) -> RankingView {
    let mut view = RankingView::new();
    view.on_open();
    view.on_rankings(&rankings_payload(names)).unwrap();
    view
}
