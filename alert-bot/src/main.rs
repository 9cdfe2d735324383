use alert_bot::logging::init_logging;
use alert_bot::telegram::TelegramClient;
use alert_bot::tls::load_rustls_config;
use alert_bot::{router, serve, AppState, Args, Config};
use anyhow::{Context, Result};
use clap::Parser;
use price_watch::{spawn_poll_loop, QuoteAdapter, WatchContext};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = Config::try_from(Args::parse()).context("invalid configuration")?;
    info!(
        listen = %config.listen_addr,
        threshold = config.threshold,
        check_interval_secs = config.check_interval.as_secs(),
        cache_duration_secs = config.cache_duration.as_secs(),
        crypto_source = ?config.crypto_source,
        tls = config.tls.is_some(),
        webhook_secret = config.webhook_secret.is_some(),
        "starting alert bot"
    );

    let tls = match &config.tls {
        Some(paths) => Some(
            load_rustls_config(paths)
                .await
                .context("load TLS certificate")?,
        ),
        None => None,
    };

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("build HTTP client")?;
    let telegram = Arc::new(TelegramClient::new(
        http.clone(),
        config.telegram_api_url.clone(),
        config.token.clone(),
    ));

    let adapter = QuoteAdapter::new(
        config.sources(&http),
        config.retry.clone(),
        config.cache_duration,
    );
    let watch = Arc::new(WatchContext::new(adapter, telegram.clone(), config.threshold));

    if let Err(err) = telegram
        .set_webhook(&config.webhook_url, config.webhook_secret.as_deref())
        .await
    {
        error!("webhook registration failed, serving anyway: {err}");
    }

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("cannot listen for ctrl-c: {err}");
                return;
            }
            info!("ctrl-c received");
            shutdown.cancel();
        }
    });

    let poller = spawn_poll_loop(watch.clone(), config.check_interval, shutdown.clone());

    let app = router(AppState::new(watch, config.webhook_secret.clone()));
    let served = serve(app, config.listen_addr, tls, shutdown.clone()).await;

    shutdown.cancel();
    poller.await.context("poll loop panicked")?;
    served
}
