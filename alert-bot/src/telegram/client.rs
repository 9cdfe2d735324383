//! Outbound Bot API calls.

use super::types::{ApiResponse, SendMessage, SetWebhook};
use async_trait::async_trait;
use price_watch::{ChatId, DeliveryError, Messenger};
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::{debug, info};

/// Thin Bot API client. The token only ever appears in request paths, and
/// transport errors are stripped of their URL before they are surfaced.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    api_base: Url,
    token: String,
}

impl TelegramClient {
    pub fn new(client: Client, api_base: Url, token: impl Into<String>) -> Self {
        Self {
            client,
            api_base,
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> Result<Url, DeliveryError> {
        let base = self.api_base.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/bot{}/{method}", self.token))
            .map_err(|e| DeliveryError::Transport(format!("bad API URL: {e}")))
    }

    /// POST `payload` to `method` and check the `ok` flag of the envelope.
    pub async fn call<P: Serialize + ?Sized>(
        &self,
        method: &str,
        payload: &P,
    ) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.method_url(method)?)
            .json(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| DeliveryError::Transport(e.without_url().to_string()))?;

        match serde_json::from_slice::<ApiResponse>(&body) {
            Ok(envelope) if envelope.ok => Ok(()),
            Ok(envelope) => {
                let code = envelope.error_code.unwrap_or(status.as_u16());
                Err(DeliveryError::Rejected(
                    envelope
                        .description
                        .unwrap_or_else(|| format!("error code {code}")),
                ))
            }
            Err(_) if status.is_client_error() => {
                Err(DeliveryError::Rejected(format!("HTTP {status}")))
            }
            Err(_) => Err(DeliveryError::Transport(format!("HTTP {status}"))),
        }
    }

    /// Register `url` as the webhook, with Telegram echoing `secret` on every
    /// delivery when one is given.
    pub async fn set_webhook(&self, url: &Url, secret: Option<&str>) -> Result<(), DeliveryError> {
        self.call(
            "setWebhook",
            &SetWebhook {
                url: url.as_str(),
                secret_token: secret,
                allowed_updates: &["message"],
            },
        )
        .await?;
        info!(webhook = %url, "webhook registered");
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError> {
        self.call(
            "sendMessage",
            &SendMessage {
                chat_id,
                text: text.to_string(),
                reply_markup: None,
            },
        )
        .await?;
        debug!(%chat_id, "message sent");
        Ok(())
    }
}
