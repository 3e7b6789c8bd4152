use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use synthgate_core::admission::AdmissionGate;
use synthgate_core::memory::{MemoryJobStore, MemoryLockStore};
use synthgate_core::store::{JobStore, LockStore};
use synthgate_db::PgStore;
use synthgate_worker::load_analyzer;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use synthgate_api::config::ServerConfig;
use synthgate_api::router::build_app_router;
use synthgate_api::standalone::EmbeddedWorker;
use synthgate_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "synthgate_api=debug,synthgate_worker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let analyzer = Arc::new(load_analyzer(config.metadata_dir.as_deref()));
    let cancel = CancellationToken::new();

    // --- Stores ---
    // With a database, separate worker processes drain the queue. Without
    // one, an embedded runner shares the in-memory stores.
    let (jobs, locks, store_backend, embedded): (
        Arc<dyn JobStore>,
        Arc<dyn LockStore>,
        &'static str,
        Option<EmbeddedWorker>,
    ) = match &config.database_url {
        Some(database_url) => {
            let pool = synthgate_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            synthgate_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            synthgate_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let store = Arc::new(PgStore::new(pool));
            let jobs: Arc<dyn JobStore> = store.clone();
            let locks: Arc<dyn LockStore> = store;
            (jobs, locks, "postgres", None)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; running standalone with in-memory stores");
            let jobs: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
            let locks: Arc<dyn LockStore> = Arc::new(MemoryLockStore::new());
            let embedded = EmbeddedWorker::spawn(
                jobs.clone(),
                AdmissionGate::new(locks.clone(), config.lock_key.as_str(), config.lock_ttl),
                analyzer.clone(),
                chrono::Duration::hours(config.result_retention_hours),
                cancel.clone(),
            );
            (jobs, locks, "memory", Some(embedded))
        }
    };

    // --- App state ---
    let state = AppState {
        jobs,
        gate: AdmissionGate::new(locks, config.lock_key.as_str(), config.lock_ttl),
        analyzer,
        config: Arc::new(config.clone()),
        store_backend,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, store = store_backend, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    if let Some(embedded) = embedded {
        embedded.join(Duration::from_secs(30)).await;
        tracing::info!("Embedded worker stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
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
