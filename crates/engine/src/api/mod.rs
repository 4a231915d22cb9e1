pub mod connections;
pub mod http;
pub mod messages;
pub mod websocket;

pub use connections::ConnectionManager;
