pub mod cache;
pub mod clock;
pub mod config;
pub mod mailer;
pub mod ports;
pub mod sqlite;
