//! Websocket front end
//!
//! Accepts TCP connections, authenticates the upgrade and hands each peer
//! to a [`Connection`] task that talks to the relay hub.

pub mod auth;
pub mod config;
pub mod connection;
pub mod listener;

pub use auth::TokenAuth;
pub use config::ServerConfig;
pub use connection::Connection;
pub use listener::RelayServer;
