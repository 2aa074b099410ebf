use std::net::SocketAddr;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use api::{AppConfig, AppState, create_router, store::PgStore};
use auth::{JwtConfig, TokenService};
use common::database::{self, DatabaseConfig, init_pool};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting API service");

    let config = AppConfig::from_env()?;
    let jwt_config = JwtConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let store = PgStore::new(pool);
    let state = AppState::new(store, TokenService::new(jwt_config), config.clone());

    let mut scheduler = start_maintenance(&state, &config.token_purge_schedule).await?;

    // Start the web server
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("API service listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = scheduler.shutdown().await {
        warn!("Failed to stop the maintenance scheduler: {}", e);
    }
    info!("API service stopped");

    Ok(())
}

/// Periodically delete expired refresh tokens and forget idle rate-limit keys
async fn start_maintenance(state: &AppState<PgStore>, schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let sessions = state.sessions.clone();
    let purge = Job::new_async(schedule, move |_, _| {
        let sessions = sessions.clone();
        Box::pin(async move {
            match sessions.cleanup_expired_sessions().await {
                Ok(purged) => info!("Token purge removed {} expired sessions", purged),
                Err(e) => error!("Token purge failed: {}", e),
            }
        })
    })?;

    let limiters = [state.auth_limiter.clone(), state.api_limiter.clone()];
    let prune = Job::new_async("0 */5 * * * *", move |_, _| {
        let limiters = limiters.clone();
        Box::pin(async move {
            let mut dropped = 0;
            for limiter in &limiters {
                dropped += limiter.prune().await;
            }
            debug!("Rate limiter pruning dropped {} idle clients", dropped);
        })
    })?;

    scheduler.add(purge).await?;
    scheduler.add(prune).await?;
    scheduler.start().await?;

    info!("Started maintenance scheduler, token purge schedule: {}", schedule);
    Ok(scheduler)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
