//! Telegram Bot API: webhook payloads and the outbound client.

pub mod client;
pub mod types;

pub use client::TelegramClient;
pub use types::{ReplyKeyboardMarkup, SendMessage, Update, WebhookReply};
