//! Shared watch context and the background poll loop.
//!
//! `WatchContext` owns everything the poll loop and the command handlers
//! share: the subscriber registry, the baseline map, the quote adapter and the
//! outbound messenger. It is built once at startup and passed around in an
//! `Arc`.
//!
//! A poll cycle walks `Idle -> Fetching -> Detecting -> Notifying -> Idle`.
//! A failed fetch goes straight back to `Idle` without detecting or notifying.
//! The loop sleeps a fixed interval after each cycle and only stops when its
//! cancellation token fires; a cycle in flight always runs to completion.

use crate::adapter::QuoteAdapter;
use crate::detector::{Baselines, PriceMove};
use crate::error::FetchError;
use crate::fanout::{notify, DeliveryOutcome, Messenger};
use crate::instrument::Instrument;
use crate::registry::{ChatId, SubscriberRegistry};
use crate::snapshot::QuoteSnapshot;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PollState {
    Idle,
    Fetching,
    Detecting,
    Notifying,
}

/// What one poll cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// False when the fetch failed and the cycle was skipped.
    pub fetched: bool,
    pub moves: Vec<PriceMove>,
    pub outcomes: Vec<DeliveryOutcome>,
}

pub struct WatchContext {
    registry: SubscriberRegistry,
    baselines: Mutex<Baselines>,
    adapter: QuoteAdapter,
    messenger: Arc<dyn Messenger>,
    threshold: i64,
    state: watch::Sender<PollState>,
}

impl WatchContext {
    pub fn new(adapter: QuoteAdapter, messenger: Arc<dyn Messenger>, threshold: i64) -> Self {
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            registry: SubscriberRegistry::new(),
            baselines: Mutex::new(Baselines::new()),
            adapter,
            messenger,
            threshold,
            state,
        }
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn poll_state(&self) -> PollState {
        *self.state.borrow()
    }

    pub async fn baseline(&self, instrument: Instrument) -> Option<i64> {
        self.baselines.lock().await.get(instrument)
    }

    /// On-demand quotes for a chat reply. Shares the adapter cache with the
    /// poll loop but never touches the baselines.
    pub async fn quote_snapshot(&self) -> Result<QuoteSnapshot, FetchError> {
        self.adapter.fetch().await
    }

    fn set_state(&self, state: PollState) {
        self.state.send_replace(state);
    }

    /// Run one fetch -> detect -> notify pass.
    pub async fn run_cycle(&self) -> CycleReport {
        self.set_state(PollState::Fetching);
        let snapshot = match self.adapter.fetch().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("skipping poll cycle: {err}");
                self.set_state(PollState::Idle);
                return CycleReport::default();
            }
        };

        self.set_state(PollState::Detecting);
        let moves = self.baselines.lock().await.detect(&snapshot, self.threshold);

        self.set_state(PollState::Notifying);
        let mut outcomes = Vec::new();
        if !moves.is_empty() {
            let recipients: Vec<ChatId> = self.registry.snapshot().await.into_iter().collect();
            for price_move in &moves {
                info!(
                    instrument = %price_move.instrument,
                    previous = price_move.previous,
                    current = price_move.current,
                    recipients = recipients.len(),
                    "price moved past threshold"
                );
                outcomes.extend(notify(self.messenger.as_ref(), price_move, &recipients).await);
            }
        } else {
            debug!("no instrument crossed the threshold");
        }

        self.set_state(PollState::Idle);
        CycleReport {
            fetched: true,
            moves,
            outcomes,
        }
    }

    /// Poll until `shutdown` is cancelled. The interval runs from the end of
    /// one cycle to the start of the next.
    pub async fn run_poll_loop(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        info!(
            interval_secs = interval.as_secs(),
            threshold = self.threshold,
            "poll loop started"
        );
        while !shutdown.is_cancelled() {
            let report = self.run_cycle().await;
            if report.fetched {
                let failed = report.outcomes.iter().filter(|o| !o.is_delivered()).count();
                debug!(
                    moves = report.moves.len(),
                    sent = report.outcomes.len() - failed,
                    failed,
                    "poll cycle finished"
                );
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        info!("poll loop stopped");
    }
}

/// Spawn the poll loop on its own task.
pub fn spawn_poll_loop(
    context: Arc<WatchContext>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(context.run_poll_loop(interval, shutdown))
}
