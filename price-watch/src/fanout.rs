//! Best-effort alert delivery to every subscriber.

use crate::detector::PriceMove;
use crate::error::DeliveryError;
use crate::format::alert_message;
use crate::registry::ChatId;
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

/// Outbound side of the messaging platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError>;
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub chat_id: ChatId,
    pub result: Result<(), DeliveryError>,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        self.result.is_ok()
    }
}

/// Send the alert for `price_move` to every recipient concurrently.
///
/// Each recipient is tried exactly once. Failures are logged and reported in
/// the returned outcomes; they never stop delivery to the others. Outcome
/// order follows `recipients`, delivery order is unspecified.
pub async fn notify<M>(
    messenger: &M,
    price_move: &PriceMove,
    recipients: &[ChatId],
) -> Vec<DeliveryOutcome>
where
    M: Messenger + ?Sized,
{
    let text = alert_message(price_move);
    let outcomes = join_all(recipients.iter().map(|chat_id| {
        let text = text.as_str();
        async move {
            let result = messenger.send_message(*chat_id, text).await;
            match &result {
                Ok(()) => debug!(%chat_id, instrument = %price_move.instrument, "alert delivered"),
                Err(err) => warn!(%chat_id, instrument = %price_move.instrument, "alert delivery failed: {err}"),
            }
            DeliveryOutcome {
                chat_id: *chat_id,
                result,
            }
        }
    }))
    .await;
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;
    use std::sync::Mutex;

    /// Records every send; fails for chat ids listed in `blocked`.
    #[derive(Default)]
    struct RecordingMessenger {
        blocked: Vec<ChatId>,
        sent: Mutex<Vec<(ChatId, String)>>,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            if self.blocked.contains(&chat_id) {
                return Err(DeliveryError::Rejected("bot was blocked by the user".into()));
            }
            Ok(())
        }
    }

    fn btc_move() -> PriceMove {
        PriceMove {
            instrument: Instrument::Btc,
            previous: 1_000_000,
            current: 1_015_000,
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_rest() {
        let messenger = RecordingMessenger {
            blocked: vec![ChatId(2)],
            ..Default::default()
        };
        let recipients = [ChatId(1), ChatId(2), ChatId(3)];

        let outcomes = notify(&messenger, &btc_move(), &recipients).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_delivered());
        assert_eq!(
            outcomes[1].result,
            Err(DeliveryError::Rejected("bot was blocked by the user".into()))
        );
        assert!(outcomes[2].is_delivered());
        // tried once each, no retries
        assert_eq!(messenger.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn every_recipient_gets_the_same_text() {
        let messenger = RecordingMessenger::default();
        notify(&messenger, &btc_move(), &[ChatId(7), ChatId(8)]).await;

        let sent = messenger.sent.lock().unwrap();
        assert!(sent.iter().all(|(_, text)| text == &alert_message(&btc_move())));
    }

    #[tokio::test]
    async fn no_recipients_sends_nothing() {
        let messenger = RecordingMessenger::default();
        assert!(notify(&messenger, &btc_move(), &[]).await.is_empty());
        assert!(messenger.sent.lock().unwrap().is_empty());
    }
}
