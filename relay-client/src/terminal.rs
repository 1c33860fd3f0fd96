use relay_core::{DISPLAY_WIDTH, GameView, RankingView};
use relay_types::{ConnectionState, MessageKind};

/// Turns state snapshots into printable lines, emitting only what changed
/// since the previous snapshot.
#[derive(Debug, Default)]
pub struct Renderer {
    seen_messages: u64,
    game_connection: Option<ConnectionState>,
    window: Vec<String>,
    game_error: Option<String>,
    ranking_connection: Option<ConnectionState>,
    ranking_error: Option<String>,
    board: Vec<String>,
    own_score: Option<u64>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn game_lines(&mut self, view: &GameView) -> Vec<String> {
        let mut lines = Vec::new();

        if self.game_connection != Some(view.connection) {
            lines.push(format!("[game] {}", view.connection));
            self.game_connection = Some(view.connection);
        }

        for message in view.messages.since(self.seen_messages) {
            let prefix = match message.kind {
                MessageKind::System => "*",
                MessageKind::User => ">",
            };
            lines.push(format!("{} {}", prefix, message.text));
        }
        self.seen_messages = view.messages.total();

        if view.error != self.game_error {
            if let Some(error) = &view.error {
                lines.push(format!("[game] error: {}", error));
            }
            self.game_error = view.error.clone();
        }

        let window = view.words.display_window(DISPLAY_WIDTH);
        if window != self.window {
            let shown: Vec<&str> = window
                .iter()
                .map(String::as_str)
                .filter(|word| !word.is_empty())
                .collect();
            lines.push(format!("[words] {}", shown.join(" → ")));
            self.window = window;
        }

        lines
    }

    pub fn ranking_lines(&mut self, view: &RankingView) -> Vec<String> {
        let mut lines = Vec::new();

        if self.ranking_connection != Some(view.connection) {
            let mut line = format!("[ranking] {}", view.connection);
            if let Some(delay) = view.next_retry {
                line.push_str(&format!(
                    " (attempt {} in {}s)",
                    view.reconnect_attempts,
                    delay.as_secs()
                ));
            }
            lines.push(line);
            self.ranking_connection = Some(view.connection);
        }

        if view.error != self.ranking_error {
            if let Some(error) = &view.error {
                lines.push(format!("[ranking] {}", error));
            }
            self.ranking_error = view.error.clone();
        }

        let board: Vec<String> = view
            .rankings
            .iter()
            .map(|entry| format!("  {:>3}. {} ({})", entry.rank, entry.name, entry.score))
            .collect();
        if board != self.board {
            lines.push("[ranking] leaderboard".to_string());
            lines.extend(board.iter().cloned());
            self.board = board;
        }

        if view.own_score != self.own_score {
            if let Some(score) = view.own_score {
                lines.push(format!("[ranking] your score: {}", score));
            }
            self.own_score = view.own_score;
        }

        lines
    }

    pub fn presence_line(count: u64) -> String {
        format!("[presence] current users: {}", count)
    }
}
