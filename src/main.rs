mod clock;
mod config;
mod connection;
mod error;
mod gateway;
mod handlers;
mod metrics;
mod pairing;
mod queue;
mod router;
mod security;
mod state;
mod wire;

use std::net::SocketAddr;

use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogFormat};
use crate::state::AppState;

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    if let Err(errors) = config::validate(&config) {
        for err in &errors {
            eprintln!("invalid configuration: {err}");
        }
        std::process::exit(1);
    }

    init_tracing(&config);
    metrics::init();

    info!(port = config.port, "starting rendezvous chat server");

    let state = AppState::new(config);
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    spawn_background_tasks(state.clone(), shutdown_tx.subscribe());

    let app = gateway::build_router(state.clone())
        .into_make_service_with_connect_info::<SocketAddr>();

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%addr, error = %err, "failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(%addr, "listening");

    let shutdown_signal = shutdown_on_ctrl_c(shutdown_tx.clone());
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
    {
        error!(error = %err, "server error");
    }

    info!("shutdown complete");
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt().json().with_env_filter(filter).init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

async fn shutdown_on_ctrl_c(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received sigterm, shutting down"),
    }
    let _ = shutdown_tx.send(());
}

/// Spawns the heartbeat sweep, queue timeout sweep, security cleanup, and
/// mode-switch-pending expiry as supervised periodic tasks, each stopping
/// on the shared shutdown signal.
fn spawn_background_tasks(
    state: std::sync::Arc<AppState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    {
        let state = state.clone();
        let mut shutdown_rx = shutdown_rx.resubscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(state.config.heartbeat_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => heartbeat_sweep(&state),
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }

    {
        let state = state.clone();
        let mut shutdown_rx = shutdown_rx.resubscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(state.config.cleanup_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let swept = state.queue.sweep_expired();
                        if swept > 0 {
                            info!(swept, "queue timeout sweep");
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }

    {
        let state = state.clone();
        let mut shutdown_rx = shutdown_rx.resubscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(state.config.cleanup_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => state.security.cleanup(),
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }

    {
        let mut shutdown_rx = shutdown_rx.resubscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(state.config.mode_switch_timeout);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let swept = state.pairing.sweep_expired_switches();
                        if swept > 0 {
                            info!(swept, "mode-switch-pending sweep");
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }
}

/// For each connection: if it hasn't answered the last probe within
/// `connection_timeout`, evict it and run the normal disconnect sequence;
/// otherwise send a fresh liveness probe.
fn heartbeat_sweep(state: &AppState) {
    let stale = state.connections.stale_users(state.config.connection_timeout);
    for user_id in &stale {
        state.connections.remove_connection(user_id);
        handlers::handle_disconnect(state, user_id);
    }

    for user_id in state.connections.all_user_ids() {
        if !stale.contains(&user_id) {
            state.connections.send_ping(&user_id);
        }
    }
}
