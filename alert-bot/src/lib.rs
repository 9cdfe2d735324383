//! Telegram front end for the price watcher: configuration, the Bot API
//! client, the command surface and the webhook server.

pub mod commands;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod telegram;
pub mod tls;

pub use config::{Args, Config, ConfigError};
pub use handlers::AppState;
pub use server::{router, serve};
