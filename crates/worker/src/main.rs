use std::sync::Arc;
use std::time::Duration;

use synthgate_core::admission::AdmissionGate;
use synthgate_db::PgStore;
use synthgate_worker::config::WorkerConfig;
use synthgate_worker::{load_analyzer, reference_orchestrator, retention, JobRunner};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "synthgate_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(worker_id = %config.worker_id, "Loaded worker configuration");

    // --- Database ---
    let pool = synthgate_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    synthgate_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    synthgate_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    let store = Arc::new(PgStore::new(pool));
    let gate = AdmissionGate::new(store.clone(), config.lock_key.as_str(), config.lock_ttl);

    // --- Engines ---
    let analyzer = Arc::new(load_analyzer(config.metadata_dir.as_deref()));
    let orchestrator = Arc::new(reference_orchestrator(analyzer));

    let runner = JobRunner::new(store.clone(), gate, orchestrator, config.worker_id.clone())
        .with_poll_interval(config.poll_interval);

    // --- Background tasks ---
    let cancel = CancellationToken::new();

    let retention_handle = tokio::spawn(retention::run(
        store.clone(),
        chrono::Duration::hours(config.result_retention_hours),
        cancel.clone(),
    ));

    let runner_cancel = cancel.clone();
    let runner_handle = tokio::spawn(async move { runner.run(runner_cancel).await });

    shutdown_signal().await;
    cancel.cancel();

    // A job in flight finishes its current unit of work before the runner exits.
    if runner_handle.await.is_err() {
        tracing::error!("Job runner task panicked");
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;

    tracing::info!("Worker shut down");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
