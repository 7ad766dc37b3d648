//! LabHub Server — scientific instrument data conversion service
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use labhub_core::config::AppConfig;
use labhub_core::error::AppError;
use labhub_registry::{CapabilityRegistry, CombinationValidator, InstrumentModelResolver};

#[tokio::main]
async fn main() {
    let env = std::env::var("LABHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting LabHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Capability tables ────────────────────────────────
    let registry = Arc::new(CapabilityRegistry::standard());

    // A table referencing an unregistered token or converter is a broken
    // deployment; refuse to serve.
    registry.verify_consistency()?;
    tracing::info!(
        extensions = registry.extensions().len(),
        test_types = registry.test_types().len(),
        instruments = registry.instruments().len(),
        combinations = registry.combinations().count(),
        "capability registry loaded"
    );

    let validator = Arc::new(CombinationValidator::new(Arc::clone(&registry)));
    let dispatch = Arc::new(labhub_convert::ConverterDispatch::new(
        config.converters.clone(),
        InstrumentModelResolver::new(),
    ));

    // ── Step 2: Upload staging store ─────────────────────────────
    let temp_store = Arc::new(labhub_storage::TempStore::new(&config.storage.upload_dir).await?);
    tracing::info!(dir = %temp_store.root().display(), "upload store ready");

    // ── Step 3: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 4: Stale-upload sweep task ──────────────────────────
    let sweep_handle = spawn_sweep_task(
        Arc::clone(&temp_store),
        Duration::from_secs(config.storage.sweep_after_minutes * 60),
        Duration::from_secs(config.storage.sweep_interval_minutes * 60),
        shutdown_rx,
    );

    // ── Step 5: Build and start HTTP server ──────────────────────
    let app_state = labhub_api::AppState {
        config: Arc::new(config.clone()),
        validator,
        dispatch,
        temp_store,
    };

    let app = labhub_api::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("LabHub server listening on {addr}");

    // ── Step 6: Graceful shutdown ────────────────────────────────
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    let _ = tokio::time::timeout(Duration::from_secs(10), sweep_handle).await;

    tracing::info!("LabHub server shut down gracefully");
    Ok(())
}

/// Periodically delete abandoned uploads.
///
/// Converters remove their input on success; files left behind by failed
/// or interrupted requests are swept once they exceed the configured age.
fn spawn_sweep_task(
    temp_store: Arc<labhub_storage::TempStore>,
    max_age: Duration,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match temp_store.sweep_stale(max_age).await {
                        Ok(0) => {}
                        Ok(removed) => tracing::info!(removed, "swept stale uploads"),
                        Err(e) => tracing::warn!("upload sweep failed: {e}"),
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
