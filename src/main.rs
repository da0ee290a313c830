//! EventHub server
//!
//! Main application entry point

use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use EventHub::{
    config::Settings,
    database::{create_pool, run_migrations, DatabaseService, PoolConfig},
    services::ServiceFactory,
    state::AppState,
    utils::logging,
};

/// `database.url` value that selects the in-process store
const IN_MEMORY_DATABASE: &str = "memory";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", EventHub::info());

    let database = if settings.database.url == IN_MEMORY_DATABASE {
        warn!("Using the in-memory store; data is lost on restart");
        DatabaseService::in_memory()
    } else {
        info!("Connecting to database...");
        let pool = create_pool(&PoolConfig::from(&settings.database)).await?;

        info!("Running database migrations...");
        run_migrations(&pool).await?;
        DatabaseService::new(pool)
    };

    info!("Initializing services...");
    let (services, email_worker) = ServiceFactory::new(&settings, database)?;

    let health = services.health_check().await;
    for issue in health.get_issues() {
        warn!(issue = %issue, "Service health issue at startup");
    }

    let address = settings.bind_address();
    let state = AppState::new(settings, services.clone());

    let limiter = state.auth_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiter.prune();
        }
    });

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Server running on {}", address);

    EventHub::serve(listener, state, EventHub::shutdown_signal()).await?;

    // Let queued confirmation emails finish before exiting
    if email_worker.is_some() && !services.notifications.wait_idle(Duration::from_secs(10)).await {
        warn!(stats = ?services.notifications.stats(), "Exiting with undelivered email jobs");
    }

    info!("Server shut down");
    Ok(())
}
