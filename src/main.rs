//! feud-sync binary entrypoint wiring the store, the display session, the
//! buzzer link and the HTTP/SSE surface.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feud_sync::{
    config::AppConfig,
    dao::game_store::GameStore,
    dto::buzzer::ConnectRequest,
    routes,
    services::{
        buzzer_service,
        poller::SnapshotPoller,
        session::{self, SessionHandle, SessionSettings},
    },
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let port = config.port;
    let app_state = AppState::new(config);

    let forwarder = buzzer_service::spawn_forwarder(app_state.clone());
    let session = start_session(&app_state).await?;
    connect_configured_serial(&app_state).await;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    if let Some(session) = session {
        session.shutdown().await;
    }
    buzzer_service::disconnect(&app_state).await;
    forwarder.abort();

    Ok(())
}

/// Install the configured store and start polling the configured game.
///
/// Without both, the service still serves buzzers and stays degraded.
async fn start_session(state: &SharedState) -> anyhow::Result<Option<SessionHandle>> {
    let Some(store) = build_store(state.config())? else {
        warn!("no store configured; display session not started");
        return Ok(None);
    };
    state.install_game_store(store.clone()).await;

    let Some(game_id) = state.config().game_id else {
        warn!("no game id configured; display session not started");
        return Ok(None);
    };

    let poller = SnapshotPoller::new(store, game_id, state.config().polling.fetch_timeout);
    let settings = SessionSettings::from(state.config());
    Ok(Some(session::spawn(state.clone(), poller, settings)))
}

#[cfg(feature = "rest-store")]
fn build_store(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn GameStore>>> {
    use feud_sync::dao::game_store::rest::{RestConfig, RestGameStore};

    let Some(store_config) = config.store.as_ref() else {
        return Ok(None);
    };
    let mut rest = RestConfig::new(store_config.url.clone());
    if let Some(key) = store_config.api_key.as_ref() {
        rest = rest.with_api_key(key.clone());
    }
    let store = RestGameStore::connect(rest).context("building REST store client")?;
    info!(url = %store_config.url, "REST store configured");
    Ok(Some(Arc::new(store)))
}

#[cfg(not(feature = "rest-store"))]
fn build_store(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn GameStore>>> {
    if config.store.is_some() {
        warn!("store URL configured but the REST backend is not compiled in");
    }
    Ok(None)
}

/// Open the serial port named in the configuration, if any.
async fn connect_configured_serial(state: &SharedState) {
    if state.config().buzzers.serial_path.is_none() {
        return;
    }
    if let Err(err) = buzzer_service::connect(state, ConnectRequest::default()).await {
        warn!(error = %err, "configured serial link could not be opened");
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
