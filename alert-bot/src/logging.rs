use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "alert_bot=debug,price_watch=debug,info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
