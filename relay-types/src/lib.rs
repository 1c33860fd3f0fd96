pub mod connection;
pub mod messages;
pub mod ranking;
pub mod user;

// Re-export all types
pub use connection::*;
pub use messages::*;
pub use ranking::*;
pub use user::*;
