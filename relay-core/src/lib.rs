pub mod game_view;
pub mod message_log;
pub mod nickname;
pub mod ranking_view;
pub mod reconnect;
pub mod word_chain;
pub mod word_validation;

// Re-export main components
pub use game_view::*;
pub use message_log::*;
pub use nickname::*;
pub use ranking_view::*;
pub use reconnect::*;
pub use word_chain::*;
pub use word_validation::*;
