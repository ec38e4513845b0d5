//! Apron Server - automaton-driven gate assignment backend

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apron_server::config::Config;
use apron_server::loops::waiting_flight_loop::run_waiting_flight_loop;
use apron_server::persistence;
use apron_server::state::AppState;
use apron_server::api;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("apron_server=debug".parse()?))
        .init();

    tracing::info!("Starting Apron Server...");

    let config = Config::from_env();
    let port = config.server_port;

    let state = match config.database_path.as_deref() {
        Some(path) => {
            let db = persistence::init_database(path, config.database_max_connections).await?;
            Arc::new(AppState::with_database(db, config.clone()))
        }
        None => {
            tracing::warn!("APRON_DATABASE_PATH not set, using in-memory store");
            Arc::new(AppState::new(config.clone()))
        }
    };
    state.load_from_store().await?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start background loops
    let reactor = tokio::spawn(run_waiting_flight_loop(
        state.orchestrator().clone(),
        state.events().subscribe_gate_freed(),
        shutdown_tx.subscribe(),
    ));

    let app = api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(());
    if let Err(err) = reactor.await {
        tracing::warn!("Waiting-flight loop ended abnormally: {}", err);
    }

    tracing::info!("Apron Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
