//! Price watch core.
//!
//! Polls upstream quote sources, detects moves past a threshold against the
//! last-known value of each instrument, and fans alerts out to every
//! subscribed chat.
//!
//! - `source`: upstream HTTP feeds, each owning a subset of instruments.
//! - `retry`: the backoff policy applied to every upstream call.
//! - `adapter`: merges sources into one `QuoteSnapshot` behind a cache.
//! - `detector`: per-instrument baselines and threshold checks.
//! - `registry`: the subscriber set.
//! - `fanout`: per-recipient best-effort delivery.
//! - `watcher`: the shared context and the background poll loop.

pub mod adapter;
pub mod detector;
pub mod error;
pub mod fanout;
pub mod format;
pub mod instrument;
pub mod registry;
pub mod retry;
pub mod snapshot;
pub mod source;
pub mod watcher;

pub use adapter::QuoteAdapter;
pub use detector::{Baselines, PriceMove};
pub use error::{DeliveryError, FetchError, SourceError};
pub use fanout::{DeliveryOutcome, Messenger};
pub use instrument::Instrument;
pub use registry::{ChatId, SubscriberRegistry};
pub use retry::RetryPolicy;
pub use snapshot::QuoteSnapshot;
pub use watcher::{spawn_poll_loop, CycleReport, PollState, WatchContext};
