//! Clash of Clans watcher
//!
//! Single-binary service that:
//! 1. Loads API tokens and the tags to watch
//! 2. Runs the polling engine against the Clash of Clans API
//! 3. Logs every change event as structured JSON
//! 4. Optionally serves /health and /metrics

mod config;
mod metrics;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use coc_api::HttpFetcher;
use coc_poller::{Category, Event, EventReceiver, Poller};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::Config;

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    poller: Arc<Poller>,
    prometheus: PrometheusHandle,
    started_at: Instant,
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting coc-watch");

    // Install before the poller exists so no metric is recorded into the void
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        tokens = config.tokens.len(),
        rate_limit = config.api.rate_limit,
        refresh_rate_ms = config.api.refresh_rate_ms,
        "configuration loaded"
    );

    let (poller, events) = Poller::new(config.poller_config(), Arc::new(HttpFetcher::new()))
        .context("failed to create poller")?;
    let poller = Arc::new(poller);
    poller.add_clans(&config.watch.clans);
    poller.add_players(&config.watch.players);
    poller.add_wars(&config.watch.wars);

    let event_log = tokio::spawn(log_events(events));

    let server = match config.server.listen_addr {
        Some(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind to {addr}"))?;
            info!(addr = %addr, "serving /health and /metrics");

            let app = build_router(AppState {
                poller: poller.clone(),
                prometheus: prometheus_handle,
                started_at: Instant::now(),
            });
            let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
            let handle = tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = stop_rx.await;
                    })
                    .await
            });
            Some((stop_tx, handle))
        }
        None => None,
    };

    // The first pass over a large watch list can take a while; a signal
    // during it must still stop the service.
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let interrupted = tokio::select! {
        _ = poller.init() => false,
        _ = &mut shutdown => true,
    };
    if !interrupted {
        info!(
            clans = poller.count(Category::Clan),
            players = poller.count(Category::Player),
            wars = poller.count(Category::War),
            "polling"
        );
        shutdown.await;
    }

    if let Some((stop_tx, handle)) = server {
        let _ = stop_tx.send(());
        match handle.await {
            Ok(Ok(())) => info!("http server stopped"),
            Ok(Err(e)) => error!(error = %e, "server error during shutdown"),
            Err(e) => error!(error = %e, "server task panicked"),
        }
    }

    poller.shutdown().await;

    // Dropping the last poller handle closes the event channel
    drop(poller);
    if let Err(e) = event_log.await {
        error!(error = %e, "event log task failed");
    }

    info!("shutdown complete");
    Ok(())
}

/// Log every engine event until the channel closes.
async fn log_events(mut events: EventReceiver) {
    while let Some(event) = events.recv().await {
        match &event {
            Event::MaintenanceStart | Event::MaintenanceEnd => {
                info!(event = event.name(), "api maintenance")
            }
            Event::ClanMemberJoined {
                clan_tag,
                member_tag,
            }
            | Event::ClanMemberLeft {
                clan_tag,
                member_tag,
            } => info!(
                event = event.name(),
                clan_tag = %clan_tag,
                member_tag = %member_tag,
                "clan membership"
            ),
            Event::WarStateChanged {
                clan_tag,
                previous_state,
                state,
            } => info!(
                event = event.name(),
                clan_tag = %clan_tag,
                previous_state = %previous_state,
                state = %state,
                "war state"
            ),
            Event::ClanUpdated { .. } | Event::PlayerUpdated { .. } | Event::WarUpdated { .. } => {
                info!(event = event.name(), tag = event.tag(), "updated")
            }
        }
    }
}

/// Returns 200 while the poll loops run, 503 before `init` or after shutdown.
/// An API maintenance window is reported but does not fail the check.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let poller = &state.poller;
    let running = poller.is_running();
    let maintenance = poller.in_maintenance();

    let (status_code, status) = match (running, maintenance) {
        (false, _) => (axum::http::StatusCode::SERVICE_UNAVAILABLE, "stopped"),
        (true, true) => (axum::http::StatusCode::OK, "maintenance"),
        (true, false) => (axum::http::StatusCode::OK, "healthy"),
    };
    let body = serde_json::json!({
        "status": status,
        "maintenance": maintenance,
        "watched": {
            "clans": poller.count(Category::Clan),
            "players": poller.count(Category::Player),
            "wars": poller.count(Category::War),
        },
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    });

    (
        status_code,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint, text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
