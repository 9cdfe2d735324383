//! HTTP handlers.

use crate::commands::{self, keyboard, Command};
use crate::middleware::WebhookSecret;
use crate::telegram::{SendMessage, Update, WebhookReply};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use price_watch::{PollState, WatchContext};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct AppState {
    pub watch: Arc<WatchContext>,
    pub secret: WebhookSecret,
}

impl AppState {
    pub fn new(watch: Arc<WatchContext>, secret: Option<String>) -> Self {
        Self {
            watch,
            secret: WebhookSecret::new(secret),
        }
    }
}

/// `POST /webhook`: one Telegram update in, at most one `sendMessage` out.
///
/// Always answers 2xx once authenticated, so Telegram never redelivers an
/// update the bot has chosen to ignore.
pub async fn webhook(
    State(state): State<AppState>,
    update: Result<Json<Update>, JsonRejection>,
) -> Response {
    let update = match update {
        Ok(Json(update)) => update,
        Err(rejection) => {
            warn!("ignoring malformed update: {}", rejection.body_text());
            return StatusCode::OK.into_response();
        }
    };

    let Some(message) = update.message else {
        debug!(update_id = update.update_id, "update without a message");
        return StatusCode::OK.into_response();
    };
    let chat_id = message.chat.id;
    let Some(command) = message.text.as_deref().and_then(Command::parse) else {
        debug!(%chat_id, "ignoring non-command message");
        return StatusCode::OK.into_response();
    };

    debug!(%chat_id, ?command, "handling command");
    let text = commands::handle(&state.watch, chat_id, command).await;
    Json(WebhookReply::from(SendMessage {
        chat_id,
        text,
        reply_markup: Some(keyboard()),
    }))
    .into_response()
}

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    poll_state: PollState,
    subscribers: usize,
}

/// `GET /healthz`
pub async fn healthz(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        poll_state: state.watch.poll_state(),
        subscribers: state.watch.registry().len().await,
    })
}
