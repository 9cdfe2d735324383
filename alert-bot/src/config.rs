//! Process configuration.
//!
//! Every setting is a command line flag with an environment variable fallback.
//! `.env` files are loaded by `main` before parsing. Settings are read once at
//! startup and validated into a [`Config`].

use clap::Parser;
use price_watch::source::{CoinGeckoSource, QuoteSource, TgjuSource};
use price_watch::{Instrument, RetryPolicy};
use reqwest::{Client, Url};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Where crypto prices come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CryptoSource {
    /// Quoted in rials by tgju alongside fiat.
    Tgju,
    /// Quoted in USD by CoinGecko, converted with `USD_RATE`.
    #[default]
    CoinGecko,
}

/// Price alert bot for Telegram.
///
/// Polls quote sources, alerts subscribed chats when a price moves past the
/// threshold, and answers /start, /stop and /now over a webhook.
#[derive(Parser, Debug, Clone)]
#[command(name = "alert-bot", author, version, about, long_about = None)]
pub struct Args {
    /// Telegram bot token
    #[arg(long = "token", env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Public URL Telegram delivers updates to, ending in /webhook
    #[arg(long = "webhook-url", env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Shared secret Telegram echoes in X-Telegram-Bot-Api-Secret-Token
    #[arg(long = "webhook-secret", env = "WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: Option<String>,

    /// Address to listen on
    #[arg(long = "listen", env = "LISTEN_ADDR", default_value = "0.0.0.0:8443")]
    pub listen: SocketAddr,

    /// Minimum absolute move, in rials, that triggers an alert
    #[arg(long = "threshold", env = "ALERT_THRESHOLD", default_value = "10000")]
    pub threshold: i64,

    /// Seconds between the end of one poll cycle and the start of the next
    #[arg(long = "check-interval", env = "CHECK_INTERVAL", default_value = "60")]
    pub check_interval: u64,

    /// Seconds a fetched snapshot is reused (0 disables the cache)
    #[arg(long = "cache-duration", env = "CACHE_DURATION", default_value = "30")]
    pub cache_duration: u64,

    /// Upstream calls per source and cycle, first attempt included
    #[arg(long = "retry-max-attempts", env = "RETRY_MAX_ATTEMPTS", default_value = "3")]
    pub retry_max_attempts: u32,

    /// Backoff before the first retry; doubles on every further retry
    #[arg(long = "retry-base-delay-ms", env = "RETRY_BASE_DELAY_MS", default_value = "1000")]
    pub retry_base_delay_ms: u64,

    /// Per-request HTTP timeout in seconds
    #[arg(long = "http-timeout", env = "HTTP_TIMEOUT", default_value = "10")]
    pub http_timeout: u64,

    #[arg(long = "tgju-url", env = "TGJU_URL", default_value = "https://api.tgju.org")]
    pub tgju_url: String,

    #[arg(
        long = "coingecko-url",
        env = "COINGECKO_URL",
        default_value = "https://api.coingecko.com"
    )]
    pub coingecko_url: String,

    /// Crypto price source: tgju or coingecko
    #[arg(
        long = "crypto-source",
        env = "CRYPTO_SOURCE",
        value_parser = parse_crypto_source,
        default_value = "coingecko"
    )]
    pub crypto_source: CryptoSource,

    /// Illustrative USD to rial rate for USD-quoted sources
    #[arg(long = "usd-rate", env = "USD_RATE", default_value = "600000")]
    pub usd_rate: f64,

    #[arg(
        long = "telegram-api-url",
        env = "TELEGRAM_API_URL",
        default_value = "https://api.telegram.org"
    )]
    pub telegram_api_url: String,

    /// Path to TLS certificate file (PEM). Serve plain HTTP when unset.
    #[arg(long = "tls-cert", env = "TLS_CERT")]
    pub tls_cert: Option<String>,

    /// Path to TLS private key file (PEM)
    #[arg(long = "tls-key", env = "TLS_KEY")]
    pub tls_key: Option<String>,
}

fn parse_crypto_source(s: &str) -> Result<CryptoSource, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "tgju" => Ok(CryptoSource::Tgju),
        "coingecko" | "gecko" => Ok(CryptoSource::CoinGecko),
        other => Err(format!(
            "invalid CRYPTO_SOURCE '{}'; expected one of: tgju, coingecko",
            other
        )),
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.into(),
    }
}

#[derive(Clone)]
pub struct TlsPaths {
    pub cert_path: String,
    pub key_path: String,
}

/// Validated settings. Not `Debug`: it carries the bot token.
#[derive(Clone)]
pub struct Config {
    pub token: String,
    pub webhook_url: Url,
    pub webhook_secret: Option<String>,
    pub listen_addr: SocketAddr,
    pub threshold: i64,
    pub check_interval: Duration,
    pub cache_duration: Duration,
    pub retry: RetryPolicy,
    pub http_timeout: Duration,
    pub tgju_url: Url,
    pub coingecko_url: Url,
    pub crypto_source: CryptoSource,
    pub usd_rate: f64,
    pub telegram_api_url: Url,
    pub tls: Option<TlsPaths>,
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_url(value: &str, name: &'static str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| invalid(name, e.to_string()))
}

/// Telegram accepts 1-256 characters from `A-Z a-z 0-9 _ -`.
fn validate_secret(secret: &str) -> Result<(), ConfigError> {
    if secret.len() > 256 {
        return Err(invalid("WEBHOOK_SECRET", "longer than 256 characters"));
    }
    if !secret
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid(
            "WEBHOOK_SECRET",
            "only A-Z, a-z, 0-9, _ and - are allowed",
        ));
    }
    Ok(())
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let token = required(args.token, "TELEGRAM_TOKEN")?;
        let webhook_url = parse_url(&required(args.webhook_url, "WEBHOOK_URL")?, "WEBHOOK_URL")?;

        let webhook_secret = args.webhook_secret.filter(|s| !s.is_empty());
        if let Some(secret) = &webhook_secret {
            validate_secret(secret)?;
        }

        if args.threshold <= 0 {
            return Err(invalid("ALERT_THRESHOLD", "must be greater than zero"));
        }
        if args.check_interval == 0 {
            return Err(invalid("CHECK_INTERVAL", "must be greater than zero"));
        }
        if args.retry_max_attempts == 0 {
            return Err(invalid("RETRY_MAX_ATTEMPTS", "must be greater than zero"));
        }
        if !(args.usd_rate.is_finite() && args.usd_rate > 0.0) {
            return Err(invalid("USD_RATE", "must be a positive number"));
        }

        let tls = match (args.tls_cert, args.tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsPaths {
                cert_path,
                key_path,
            }),
            (None, None) => None,
            _ => return Err(invalid("TLS_CERT/TLS_KEY", "set both or neither")),
        };

        Ok(Self {
            token,
            webhook_url,
            webhook_secret,
            listen_addr: args.listen,
            threshold: args.threshold,
            check_interval: Duration::from_secs(args.check_interval),
            cache_duration: Duration::from_secs(args.cache_duration),
            retry: RetryPolicy::new(
                args.retry_max_attempts,
                Duration::from_millis(args.retry_base_delay_ms),
            ),
            http_timeout: Duration::from_secs(args.http_timeout),
            tgju_url: parse_url(&args.tgju_url, "TGJU_URL")?,
            coingecko_url: parse_url(&args.coingecko_url, "COINGECKO_URL")?,
            crypto_source: args.crypto_source,
            usd_rate: args.usd_rate,
            telegram_api_url: parse_url(&args.telegram_api_url, "TELEGRAM_API_URL")?,
            tls,
        })
    }
}

impl Config {
    /// Quote sources for the configured crypto feed. tgju always serves fiat
    /// and gold.
    pub fn sources(&self, client: &Client) -> Vec<Arc<dyn QuoteSource>> {
        let mut tgju_instruments = vec![Instrument::Usd, Instrument::Eur, Instrument::Gold18];
        let crypto: Vec<Instrument> = Instrument::all()
            .into_iter()
            .filter(|i| i.is_crypto())
            .collect();

        let mut sources: Vec<Arc<dyn QuoteSource>> = Vec::new();
        match self.crypto_source {
            CryptoSource::Tgju => tgju_instruments.extend(crypto),
            CryptoSource::CoinGecko => sources.push(Arc::new(CoinGeckoSource::new(
                client.clone(),
                self.coingecko_url.clone(),
                crypto,
                self.usd_rate,
            ))),
        }
        sources.insert(
            0,
            Arc::new(TgjuSource::new(
                client.clone(),
                self.tgju_url.clone(),
                tgju_instruments,
            )),
        );
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec![
            "alert-bot",
            "--token",
            "123:abc",
            "--webhook-url",
            "https://bot.example.com/webhook",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::try_from(args(&[])).unwrap();
        assert_eq!(config.threshold, 10_000);
        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert_eq!(config.cache_duration, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_secs(1));
        assert_eq!(config.crypto_source, CryptoSource::CoinGecko);
        assert!(config.tls.is_none());
    }

    #[test]
    fn missing_token_is_a_configuration_error() {
        let mut parsed = args(&[]);
        parsed.token = None;
        assert_eq!(
            Config::try_from(parsed).err(),
            Some(ConfigError::Missing("TELEGRAM_TOKEN"))
        );

        let mut parsed = args(&[]);
        parsed.token = Some("   ".into());
        assert!(Config::try_from(parsed).is_err());
    }

    #[test]
    fn rejects_non_positive_threshold_and_interval() {
        assert!(Config::try_from(args(&["--threshold", "0"])).is_err());
        assert!(Config::try_from(args(&["--check-interval", "0"])).is_err());
    }

    #[test]
    fn tls_needs_both_paths() {
        assert!(Config::try_from(args(&["--tls-cert", "cert.pem"])).is_err());
        let config =
            Config::try_from(args(&["--tls-cert", "cert.pem", "--tls-key", "key.pem"])).unwrap();
        assert!(config.tls.is_some());
    }

    #[test]
    fn secret_must_use_telegram_alphabet() {
        assert!(Config::try_from(args(&["--webhook-secret", "s3cr3t_token-1"])).is_ok());
        assert!(Config::try_from(args(&["--webhook-secret", "has space"])).is_err());
    }

    #[test]
    fn crypto_source_selects_feeds() {
        let client = Client::new();

        let config = Config::try_from(args(&[])).unwrap();
        let sources = config.sources(&client);
        assert_eq!(
            sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            vec!["tgju", "coingecko"]
        );
        assert_eq!(sources[1].instruments(), &[Instrument::Btc, Instrument::Eth]);

        let config = Config::try_from(args(&["--crypto-source", "tgju"])).unwrap();
        let sources = config.sources(&client);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].instruments().len(), 5);
    }

    #[test]
    fn unknown_crypto_source_is_rejected_by_the_parser() {
        assert!(parse_crypto_source("binance").is_err());
        assert_eq!(parse_crypto_source(" TGJU "), Ok(CryptoSource::Tgju));
    }
}
