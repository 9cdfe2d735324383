use super::serialization::{number_from_value, to_rials};
use super::{endpoint, get_body, QuoteSource, SourceQuotes};
use crate::error::SourceError;
use crate::instrument::Instrument;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

const NAME: &str = "coingecko";
const SIMPLE_PRICE_PATH: &str = "api/v3/simple/price";

/// CoinGecko `/simple/price` feed. Prices come back in USD and are converted
/// to rials with a fixed, illustrative rate.
#[derive(Debug, Clone)]
pub struct CoinGeckoSource {
    client: Client,
    base: Url,
    instruments: Vec<Instrument>,
    usd_rate: f64,
}

impl CoinGeckoSource {
    /// `base` is the API origin, e.g. `https://api.coingecko.com`.
    ///
    /// Instruments without a CoinGecko asset id are dropped.
    pub fn new(client: Client, base: Url, instruments: Vec<Instrument>, usd_rate: f64) -> Self {
        let instruments = instruments
            .into_iter()
            .filter(|i| Self::asset_id(*i).is_some())
            .collect();
        Self {
            client,
            base,
            instruments,
            usd_rate,
        }
    }

    /// Map an instrument to CoinGecko's asset id.
    pub fn asset_id(instrument: Instrument) -> Option<&'static str> {
        match instrument {
            Instrument::Btc => Some("bitcoin"),
            Instrument::Eth => Some("ethereum"),
            Instrument::Gold18 | Instrument::Usd | Instrument::Eur => None,
        }
    }

    fn url(&self) -> Result<Url, SourceError> {
        let ids: Vec<&str> = self
            .instruments
            .iter()
            .filter_map(|i| Self::asset_id(*i))
            .collect();
        let mut url = endpoint(NAME, &self.base, SIMPLE_PRICE_PATH)?;
        url.query_pairs_mut()
            .append_pair("ids", &ids.join(","))
            .append_pair("vs_currencies", "usd");
        Ok(url)
    }

    fn parse(&self, body: &[u8]) -> Result<SourceQuotes, SourceError> {
        // Parse like: { "bitcoin": {"usd": 12345.6}, ... }
        let parsed: HashMap<String, HashMap<String, Value>> = serde_json::from_slice(body)
            .map_err(|e| SourceError::SchemaMismatch {
                source_name: NAME.to_string(),
                reason: e.to_string(),
            })?;

        let mut out = SourceQuotes::new();
        for instrument in &self.instruments {
            let Some(id) = Self::asset_id(*instrument) else {
                continue;
            };
            let value = parsed
                .get(id)
                .ok_or_else(|| format!("id {id} missing"))
                .and_then(|rec| rec.get("usd").ok_or_else(|| format!("usd missing for {id}")))
                .and_then(number_from_value)
                .and_then(|usd| to_rials(usd * self.usd_rate));
            match value {
                Ok(v) => {
                    out.insert(*instrument, Some(v));
                }
                Err(reason) => {
                    warn!(source = NAME, %instrument, "schema mismatch: {reason}");
                    out.insert(*instrument, None);
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl QuoteSource for CoinGeckoSource {
    fn name(&self) -> &str {
        NAME
    }

    fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    async fn fetch(&self) -> Result<SourceQuotes, SourceError> {
        let body = get_body(&self.client, NAME, self.url()?).await?;
        self.parse(&body)
    }
}
