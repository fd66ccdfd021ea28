use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jobrelay_agents::AgentConfig;
use jobrelay_db::{JobStore, MemoryJobStore, PgJobStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobrelay_api::background::reconciler::Reconciler;
use jobrelay_api::config::{ServerConfig, StoreBackend};
use jobrelay_api::engine::{trigger_channel, Coordinator, Dispatcher, JobRunner, Poller};
use jobrelay_api::router::build_app_router;
use jobrelay_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobrelay_api=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        store_backend = ?config.store_backend,
        "Loaded server configuration",
    );

    // --- Job store ---
    let store: Arc<dyn JobStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

            let pool = jobrelay_db::create_pool(&database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            jobrelay_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            jobrelay_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgJobStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory job store; jobs are lost on restart");
            Arc::new(MemoryJobStore::new())
        }
    };

    // --- Workers ---
    let agent_config = AgentConfig::from_env();
    let registry = Arc::new(
        jobrelay_agents::build_registry(&agent_config).expect("Failed to register workers"),
    );

    // --- Engine ---
    let shutdown = CancellationToken::new();
    let (triggers, receiver) = trigger_channel(config.trigger_queue_capacity);

    let coordinator = Arc::new(
        Coordinator::new(Arc::clone(&store), Arc::clone(&registry))
            .with_timeout(config.job_timeout()),
    );
    let runner = JobRunner::new(coordinator, receiver, config.max_concurrent_jobs);
    let runner_handle = tokio::spawn(runner.run(
        shutdown.clone(),
        Duration::from_secs(config.shutdown_timeout_secs),
    ));

    let reconciler = Reconciler::new(
        Arc::clone(&store),
        triggers.clone(),
        Duration::from_secs(config.reconcile_interval_secs),
        Duration::from_secs(config.stale_pending_secs),
    );
    let reconciler_handle = tokio::spawn(reconciler.run(shutdown.clone()));

    tracing::info!("Job engine started (runner, reconciler)");

    // --- App state ---
    let state = AppState {
        store: Arc::clone(&store),
        dispatcher: Arc::new(Dispatcher::new(Arc::clone(&store), registry, triggers)),
        poller: Poller::new(store),
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    shutdown.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), reconciler_handle).await;
    tracing::info!("Reconciler stopped");

    // The runner bounds its own drain by `shutdown_timeout_secs`.
    let _ = runner_handle.await;

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
