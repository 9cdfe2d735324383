//! Chat command surface.

use crate::telegram::ReplyKeyboardMarkup;
use price_watch::format::{format_rials, snapshot_listing, CURRENCY};
use price_watch::{ChatId, WatchContext};
use tracing::{info, warn};

pub const BUTTON_SNAPSHOT: &str = "📥 Live prices";
pub const BUTTON_SUBSCRIBE: &str = "✅ Enable alerts";
pub const BUTTON_UNSUBSCRIBE: &str = "🛑 Disable alerts";

pub const TRY_AGAIN_LATER: &str = "❌ Could not fetch prices right now. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Subscribe,
    Unsubscribe,
    Snapshot,
}

impl Command {
    /// Recognise a slash command (optionally addressed as `/cmd@bot`, extra
    /// words ignored) or a keyboard button label. Anything else is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix('/') {
            let word = rest.split_whitespace().next().unwrap_or("");
            let name = word.split('@').next().unwrap_or("");
            return match name.to_ascii_lowercase().as_str() {
                "start" | "subscribe" => Some(Command::Subscribe),
                "stop" | "unsubscribe" => Some(Command::Unsubscribe),
                "now" | "prices" => Some(Command::Snapshot),
                _ => None,
            };
        }
        match text {
            BUTTON_SUBSCRIBE => Some(Command::Subscribe),
            BUTTON_UNSUBSCRIBE => Some(Command::Unsubscribe),
            BUTTON_SNAPSHOT => Some(Command::Snapshot),
            _ => None,
        }
    }
}

/// Keyboard attached to every command reply.
pub fn keyboard() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::from_rows(&[
        &[BUTTON_SNAPSHOT],
        &[BUTTON_SUBSCRIBE, BUTTON_UNSUBSCRIBE],
    ])
}

/// Apply `command` for `chat_id` and return the reply text.
pub async fn handle(ctx: &WatchContext, chat_id: ChatId, command: Command) -> String {
    match command {
        Command::Subscribe => {
            if ctx.registry().add(chat_id).await {
                info!(%chat_id, "subscribed");
            }
            format!(
                "✅ Price alerts enabled.\nYou will get a message whenever a price moves by {} {CURRENCY} or more.",
                format_rials(ctx.threshold())
            )
        }
        Command::Unsubscribe => {
            if ctx.registry().remove(chat_id).await {
                info!(%chat_id, "unsubscribed");
                "🛑 Price alerts disabled.".to_string()
            } else {
                "You were not subscribed to price alerts.".to_string()
            }
        }
        Command::Snapshot => match ctx.quote_snapshot().await {
            Ok(snapshot) if !snapshot.all_absent() => snapshot_listing(&snapshot),
            Ok(_) => {
                warn!(%chat_id, "snapshot requested but every price is unavailable");
                TRY_AGAIN_LATER.to_string()
            }
            Err(err) => {
                warn!(%chat_id, "snapshot requested during source failure: {err}");
                TRY_AGAIN_LATER.to_string()
            }
        },
    }
}
