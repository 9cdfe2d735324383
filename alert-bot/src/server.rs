//! Router assembly and the listener.

use crate::handlers::{healthz, webhook, AppState};
use crate::middleware::require_webhook_secret;
use anyhow::{Context, Result};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

pub const WEBHOOK_PATH: &str = "/webhook";

/// How long in-flight requests may run once shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/healthz", get(healthz))
        .with_state(state.clone());

    // Only the webhook needs the secret
    let protected = Router::new()
        .route(WEBHOOK_PATH, post(webhook))
        .with_state(state.clone())
        .route_layer(from_fn_with_state(state.secret.clone(), require_webhook_secret));

    public.merge(protected).layer(TraceLayer::new_for_http())
}

/// Serve `app` until `shutdown` is cancelled, then drain open connections.
pub async fn serve(
    app: Router,
    addr: SocketAddr,
    tls: Option<RustlsConfig>,
    shutdown: CancellationToken,
) -> Result<()> {
    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown.cancelled().await;
            info!("shutting down http server");
            handle.graceful_shutdown(Some(DRAIN_TIMEOUT));
        }
    });

    match tls {
        Some(tls) => {
            info!("listening on https://{addr}");
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            info!("listening on http://{addr}");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    }
    .with_context(|| format!("serve on {addr}"))
}
