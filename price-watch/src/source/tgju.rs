use super::serialization::{number_from_value, to_rials};
use super::{endpoint, get_body, QuoteSource, SourceQuotes};
use crate::error::SourceError;
use crate::instrument::Instrument;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

const NAME: &str = "tgju";
const LATEST_PATH: &str = "v1/price/latest";

/// tgju.org market feed, quoted directly in rials.
///
/// Response shape: `{"data": {"price_dollar_rl": {"p": "1,015,000"}, ...}}`.
#[derive(Debug, Clone)]
pub struct TgjuSource {
    client: Client,
    base: Url,
    instruments: Vec<Instrument>,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    data: HashMap<String, Value>,
}

impl TgjuSource {
    /// `base` is the API origin, e.g. `https://api.tgju.org`.
    pub fn new(client: Client, base: Url, instruments: Vec<Instrument>) -> Self {
        Self {
            client,
            base,
            instruments,
        }
    }

    /// The feed's item code for an instrument.
    pub fn code_for(instrument: Instrument) -> &'static str {
        match instrument {
            Instrument::Usd => "price_dollar_rl",
            Instrument::Eur => "price_eur",
            Instrument::Gold18 => "geram18",
            Instrument::Btc => "crypto-bitcoin",
            Instrument::Eth => "crypto-ethereum",
        }
    }

    fn parse(&self, body: &[u8]) -> Result<SourceQuotes, SourceError> {
        let parsed: LatestResponse =
            serde_json::from_slice(body).map_err(|e| SourceError::SchemaMismatch {
                source_name: NAME.to_string(),
                reason: e.to_string(),
            })?;

        let mut out = SourceQuotes::new();
        for instrument in &self.instruments {
            let code = Self::code_for(*instrument);
            let value = parsed
                .data
                .get(code)
                .ok_or_else(|| format!("item {code} missing"))
                .and_then(|item| item.get("p").ok_or_else(|| format!("{code}.p missing")))
                .and_then(number_from_value)
                .and_then(to_rials);
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
impl QuoteSource for TgjuSource {
    fn name(&self) -> &str {
        NAME
    }

    fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    async fn fetch(&self) -> Result<SourceQuotes, SourceError> {
        let url = endpoint(NAME, &self.base, LATEST_PATH)?;
        let body = get_body(&self.client, NAME, url).await?;
        self.parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(instruments: Vec<Instrument>) -> TgjuSource {
        TgjuSource::new(
            Client::new(),
            Url::parse("https://api.tgju.org").unwrap(),
            instruments,
        )
    }

    #[test]
    fn parses_string_and_number_prices() {
        let body = json!({
            "data": {
                "price_dollar_rl": {"p": "1,015,000"},
                "price_eur": {"p": 1100000},
                "geram18": {"p": "63,450,000", "h": "64,000,000"}
            }
        });
        let quotes = source(vec![Instrument::Usd, Instrument::Eur, Instrument::Gold18])
            .parse(body.to_string().as_bytes())
            .unwrap();

        assert_eq!(quotes[&Instrument::Usd], Some(1_015_000));
        assert_eq!(quotes[&Instrument::Eur], Some(1_100_000));
        assert_eq!(quotes[&Instrument::Gold18], Some(63_450_000));
    }

    #[test]
    fn malformed_field_only_blanks_its_instrument() {
        let body = json!({
            "data": {
                "price_dollar_rl": {"p": "not a price"},
                "price_eur": {"p": "1,100,000"}
            }
        });
        let quotes = source(vec![Instrument::Usd, Instrument::Eur, Instrument::Gold18])
            .parse(body.to_string().as_bytes())
            .unwrap();

        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[&Instrument::Usd], None);
        assert_eq!(quotes[&Instrument::Eur], Some(1_100_000));
        // missing item
        assert_eq!(quotes[&Instrument::Gold18], None);
    }

    #[test]
    fn body_without_data_is_a_schema_mismatch() {
        let err = source(vec![Instrument::Usd])
            .parse(br#"{"error": "maintenance"}"#)
            .unwrap_err();
        assert!(matches!(err, SourceError::SchemaMismatch { .. }));
        assert!(!err.is_retryable());
    }
}
