//! Upstream quote sources.
//!
//! Each source owns a subset of the instrument catalog and turns its own
//! response shape into integer rial values. A source makes exactly one HTTP
//! attempt per `fetch`; retrying is the adapter's job.

pub mod coingecko;
mod serialization;
pub mod tgju;

pub use coingecko::CoinGeckoSource;
pub use tgju::TgjuSource;

use crate::error::SourceError;
use crate::instrument::Instrument;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::collections::HashMap;

/// Values reported by one source. Malformed fields are `None`.
pub type SourceQuotes = HashMap<Instrument, Option<i64>>;

#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Instruments this source is responsible for.
    fn instruments(&self) -> &[Instrument];

    /// One attempt at fetching every owned instrument.
    async fn fetch(&self) -> Result<SourceQuotes, SourceError>;
}

/// GET `url` and return the body, classifying failures for the retry policy.
pub(crate) async fn get_body(client: &Client, name: &str, url: Url) -> Result<Vec<u8>, SourceError> {
    let resp = client
        .get(url)
        .header("accept", "application/json")
        .send()
        .await
        .map_err(|e| SourceError::Unavailable {
            source_name: name.to_string(),
            reason: e.to_string(),
        })?;

    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimited {
            source_name: name.to_string(),
        });
    }
    if !status.is_success() {
        return Err(SourceError::Unavailable {
            source_name: name.to_string(),
            reason: format!("status {status}"),
        });
    }

    let body = resp.bytes().await.map_err(|e| SourceError::Unavailable {
        source_name: name.to_string(),
        reason: format!("read body failed: {e}"),
    })?;
    Ok(body.to_vec())
}

/// Resolve `path` under a configured base URL. Any path prefix on the base
/// (a proxy mount such as `/tgju`) is kept.
pub(crate) fn endpoint(name: &str, base: &Url, path: &str) -> Result<Url, SourceError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| SourceError::Unavailable {
            source_name: name.to_string(),
            reason: format!("invalid endpoint {path}: {e}"),
        })
}
