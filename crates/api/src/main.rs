use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use liftlog_core::rate_limit::RateLimiter;
use liftlog_db::store::PgConsumptionStore;
use liftlog_verification::config::VerificationConfig;
use liftlog_verification::PurchaseVerifier;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use liftlog_api::config::ServerConfig;
use liftlog_api::metrics::RequestMetrics;
use liftlog_api::planner::HttpPlanGenerator;
use liftlog_api::router::build_app_router;
use liftlog_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liftlog_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = liftlog_db::create_pool(&database_url, config.database_max_connections)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    liftlog_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    liftlog_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Purchase verification ---
    let verifier = PurchaseVerifier::from_config(VerificationConfig::from_env())
        .expect("Failed to build verification HTTP client");
    tracing::info!("Purchase verification services registered");

    // --- Rate limiter ---
    let store = Arc::new(PgConsumptionStore::new(pool));
    let rate_limiter = RateLimiter::new(store, config.rate_limit);
    tracing::info!(
        web_daily_quota = config.rate_limit.web_daily_quota,
        mobile_daily_quota = config.rate_limit.mobile_daily_quota,
        "Rate limiter configured"
    );

    // --- Plan generator ---
    let plan_generator = HttpPlanGenerator::new(
        config.plan_generator_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )
    .expect("Failed to build plan generator HTTP client");

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        verifier: Arc::new(verifier),
        rate_limiter: Arc::new(rate_limiter),
        plan_generator: Arc::new(plan_generator),
        metrics: RequestMetrics::new(),
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

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
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
