//! Pulse server binary.
//!
//! Hosts the event webhook and callables, runs the trigger worker and the
//! optional counter reconciliation task, and stops on SIGTERM or Ctrl+C.

use std::net::SocketAddr;
use std::sync::Arc;

use pulse_server::config::{self, Config, ConfigError, LoggingConfig};
use pulse_server::{app, background, triggers, AppState};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("database pool: {0}")]
    Pool(#[from] pulse_db::PoolError),
    #[error("database connection: {0}")]
    Connection(#[from] r2d2::Error),
    #[error("migrations: {0}")]
    Migrations(#[from] pulse_db::MigrationError),
    #[error("push delivery: {0}")]
    Push(#[from] pulse_push::PushError),
    #[error("listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server: {0}")]
    Serve(std::io::Error),
}

/// First CLI argument, then `PULSE_CONFIG_PATH`, then `config.toml`.
fn config_path() -> (String, &'static str) {
    let non_blank = |value: &String| !value.trim().is_empty();
    if let Some(path) = std::env::args().nth(1).filter(non_blank) {
        return (path, "cli-arg");
    }
    match std::env::var("PULSE_CONFIG_PATH").ok().filter(non_blank) {
        Some(path) => (path, "env-var"),
        None => ("config.toml".to_string(), "default"),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_state(config: &Config) -> Result<(AppState, triggers::TriggerReceiver), StartupError> {
    let pool = pulse_db::create_pool(
        &config.database.path,
        pulse_db::DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )?;

    let applied = pulse_db::run_migrations(&*pool.get()?)?;
    if applied > 0 {
        tracing::info!(count = applied, "applied database migrations");
    }

    let push = pulse_push::PushDispatcher::from_config(pool.clone(), &config.push)?;

    let (sender, receiver) = triggers::channel(config.triggers.queue_capacity);
    let state = AppState {
        pool,
        push,
        triggers: sender,
        fanout_concurrency: config.push.fanout_concurrency,
    };
    Ok((state, receiver))
}

async fn run() -> Result<(), StartupError> {
    let (path, source) = config_path();
    let config = config::load_config(Some(&path))?;
    init_tracing(&config.logging);
    tracing::info!(%source, %path, "loaded configuration");

    let (state, receiver) = build_state(&config)?;

    let shared = Arc::new(state.clone());
    tokio::spawn(background::run_trigger_worker(shared.clone(), receiver));
    tokio::spawn(background::start_reconcile_task(
        shared,
        config.triggers.reconcile_interval_seconds,
    ));

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    tracing::info!(%addr, "pulse server listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("pulse server stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // Tracing may not be initialized yet when configuration fails.
        eprintln!("pulse-server: {err}");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("SIGINT received, shutting down"),
        () = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
