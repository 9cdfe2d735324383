//! Quote source adapter: fan-in of every configured source behind a short
//! lived cache.

use crate::error::{FetchError, SourceError};
use crate::instrument::Instrument;
use crate::retry::RetryPolicy;
use crate::snapshot::QuoteSnapshot;
use crate::source::{QuoteSource, SourceQuotes};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Most recent snapshot and the instant it was captured.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub snapshot: QuoteSnapshot,
    pub captured_at: Instant,
}

impl CacheEntry {
    pub fn is_valid(&self, cache_duration: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.captured_at) < cache_duration
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    /// Outcome of the most recent refresh, failures included.
    last_refresh: Option<Result<QuoteSnapshot, FetchError>>,
}

pub struct QuoteAdapter {
    sources: Vec<Arc<dyn QuoteSource>>,
    retry: RetryPolicy,
    cache_duration: Duration,
    cache: Mutex<CacheState>,
    /// Completed refreshes. Only bumped with `cache` held.
    refreshes: AtomicU64,
}

impl QuoteAdapter {
    pub fn new(
        sources: Vec<Arc<dyn QuoteSource>>,
        retry: RetryPolicy,
        cache_duration: Duration,
    ) -> Self {
        Self {
            sources,
            retry,
            cache_duration,
            cache: Mutex::new(CacheState::default()),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Every instrument owned by at least one source, in catalog order.
    pub fn instruments(&self) -> Vec<Instrument> {
        let mut all: Vec<Instrument> = self
            .sources
            .iter()
            .flat_map(|s| s.instruments().iter().copied())
            .collect();
        all.sort();
        all.dedup();
        all
    }

    /// Current quotes, from the cache when it is still fresh.
    ///
    /// At most one refresh is in flight. Callers that queued behind it take
    /// its outcome, a total failure included, instead of going upstream
    /// again. A failure is not kept for callers that arrive afterwards.
    pub async fn fetch(&self) -> Result<QuoteSnapshot, FetchError> {
        if self.sources.is_empty() {
            return Err(FetchError::NoSources);
        }

        let seen = self.refreshes.load(Ordering::Acquire);
        let mut cache = self.cache.lock().await;

        if self.refreshes.load(Ordering::Acquire) != seen {
            if let Some(outcome) = cache.last_refresh.clone() {
                debug!("sharing the refresh that finished while waiting");
                return outcome;
            }
        }
        if let Some(entry) = cache.entry.as_ref() {
            if entry.is_valid(self.cache_duration, Instant::now()) {
                debug!("serving quotes from cache");
                return Ok(entry.snapshot.clone());
            }
        }

        let outcome = self.fetch_sources().await;
        if let Ok(snapshot) = &outcome {
            cache.entry = Some(CacheEntry {
                snapshot: snapshot.clone(),
                captured_at: Instant::now(),
            });
        }
        cache.last_refresh = Some(outcome.clone());
        self.refreshes.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// Drop the cached snapshot so the next `fetch` goes upstream.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.lock().await;
        cache.entry = None;
        cache.last_refresh = None;
    }

    async fn fetch_sources(&self) -> Result<QuoteSnapshot, FetchError> {
        let results = join_all(self.sources.iter().map(|source| {
            let source = source.clone();
            async move {
                let result = self.retry.run(|| source.fetch()).await;
                (source, result)
            }
        }))
        .await;

        let mut snapshot = QuoteSnapshot::new();
        let mut failed = 0;
        for (source, result) in results {
            match result {
                Ok(quotes) => merge(&mut snapshot, source.instruments(), &quotes),
                Err(err) => {
                    failed += 1;
                    log_failure(&err);
                    snapshot.mark_absent(source.instruments());
                }
            }
        }

        if failed == self.sources.len() {
            warn!(failed, "every quote source failed");
            return Err(FetchError::AllSourcesFailed { failed });
        }

        info!(
            instruments = snapshot.len(),
            available = snapshot.iter().filter(|(_, v)| v.is_some()).count(),
            "fetched quotes"
        );
        Ok(snapshot)
    }
}

/// Fold one source's quotes into the snapshot. A value from one source is
/// never blanked by another source that owns the same instrument but failed.
fn merge(snapshot: &mut QuoteSnapshot, owned: &[Instrument], quotes: &SourceQuotes) {
    for instrument in owned {
        let value = quotes.get(instrument).copied().flatten();
        if value.is_some() || !snapshot.contains(*instrument) {
            snapshot.insert(*instrument, value);
        }
    }
}

fn log_failure(err: &SourceError) {
    match err {
        SourceError::RateLimited { source_name } => {
            warn!(source = %source_name, status = 429, "quote source rate limited, retries exhausted")
        }
        SourceError::Unavailable {
            source_name,
            reason,
        } => warn!(source = %source_name, %reason, "quote source unavailable"),
        SourceError::SchemaMismatch {
            source_name,
            reason,
        } => warn!(source = %source_name, %reason, "quote source schema mismatch"),
    }
}
