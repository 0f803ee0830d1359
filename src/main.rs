#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use resona_server::config::Config;
use resona_server::services::auth_service::AuthService;
use resona_server::services::spotify_service::SpotifyService;
use resona_server::storage::{MemoryStore, SharedSessionStore};
use resona_server::workers::LoginStateSweepWorker;
use resona_server::{api, telemetry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    telemetry::init_telemetry(&config.telemetry)?;

    let boot_span = tracing::info_span!("boot_server");
    let (api_listener, mgmt_listener, app_router, mgmt_app, shutdown_tx, shutdown_rx, sweeper) =
        async {
            // Phase 1: Infrastructure Setup (Resources)
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            resona_server::spawn_signal_handler(shutdown_tx.clone());

            let login_states: SharedSessionStore = Arc::new(MemoryStore::new());

            // Phase 2: Component Wiring (Pure logic, no side effects)
            let auth_service = AuthService::new(
                config.spotify.clone(),
                config.session.clone(),
                Arc::clone(&login_states),
            )?;
            let spotify_service = SpotifyService::new(config.spotify.clone(), auth_service.clone())?;
            let sweeper =
                LoginStateSweepWorker::new(login_states, config.session.sweep_interval_secs);

            // Phase 3: Runtime Setup (Listeners and Routers)
            let app_router = api::app_router(config.clone(), auth_service, spotify_service);
            let mgmt_app = api::mgmt_router();

            let api_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
            let mgmt_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.mgmt_port).parse()?;

            tracing::info!(address = %api_addr, "listening");
            tracing::info!(address = %mgmt_addr, "management server listening");

            let api_listener = tokio::net::TcpListener::bind(api_addr).await?;
            let mgmt_listener = tokio::net::TcpListener::bind(mgmt_addr).await?;

            Ok::<
                (
                    tokio::net::TcpListener,
                    tokio::net::TcpListener,
                    axum::Router,
                    axum::Router,
                    watch::Sender<bool>,
                    watch::Receiver<bool>,
                    LoginStateSweepWorker,
                ),
                anyhow::Error,
            >((api_listener, mgmt_listener, app_router, mgmt_app, shutdown_tx, shutdown_rx, sweeper))
        }
        .instrument(boot_span)
        .await?;

    // Phase 4: Start Runtime (Explicit Spawning and Listening)
    let sweep_task = tokio::spawn(sweeper.run(shutdown_rx.clone()));

    let mut api_rx = shutdown_rx.clone();
    let api_server = axum::serve(api_listener, app_router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = api_rx.wait_for(|&s| s).await;
        });

    let mut mgmt_rx = shutdown_rx.clone();
    let mgmt_server = axum::serve(mgmt_listener, mgmt_app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = mgmt_rx.wait_for(|&s| s).await;
        });

    if let Err(e) = tokio::try_join!(api_server, mgmt_server) {
        tracing::error!(error = %e, "Server error");
    }

    // Phase 5: Graceful Shutdown Orchestration
    let _ = shutdown_tx.send(true);
    tokio::select! {
        _ = sweep_task => {
            tracing::info!("Background tasks finished.");
        }
        () = tokio::time::sleep(std::time::Duration::from_secs(config.server.shutdown_timeout_secs)) => {
            tracing::warn!("Timeout waiting for background tasks to finish.");
        }
    }

    Ok(())
}
