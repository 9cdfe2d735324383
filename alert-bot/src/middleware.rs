//! Webhook authentication.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

/// Header Telegram sets to the `secret_token` registered with `setWebhook`.
pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Expected webhook secret. `None` accepts every request.
#[derive(Clone, Default)]
pub struct WebhookSecret(Option<Arc<str>>);

impl WebhookSecret {
    pub fn new(secret: Option<String>) -> Self {
        Self(secret.filter(|s| !s.is_empty()).map(Arc::from))
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    fn matches(&self, provided: &str) -> bool {
        match &self.0 {
            Some(expected) => provided.as_bytes().ct_eq(expected.as_bytes()).into(),
            None => true,
        }
    }
}

/// Reject webhook calls whose secret header is missing or wrong.
pub async fn require_webhook_secret(
    State(secret): State<WebhookSecret>,
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if secret.is_set() {
        let provided = req
            .headers()
            .get(SECRET_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");
        if !secret.matches(provided) {
            warn!("rejected webhook call with a bad secret token");
            return Err((StatusCode::UNAUTHORIZED, "missing or invalid secret token"));
        }
    }
    Ok(next.run(req).await)
}
