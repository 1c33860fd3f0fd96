pub mod config;
pub mod error;
pub mod game;
pub mod identity;
pub mod presence;
pub mod ranking;
pub mod stomp;
pub mod terminal;

mod task;

pub use config::{Config, ConfigError};
pub use error::{ClientError, IdentityError};
pub use game::{GameClient, GameClientOptions, GameTransport, WebSocketTransport};
pub use identity::{BrowserIdentity, FileStore, KeyValueStore, MemoryStore};
pub use presence::{HttpPresenceApi, PresenceApi, PresenceTracker};
pub use ranking::{RankingClient, RankingTransport, SseRankingTransport};
