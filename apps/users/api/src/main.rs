use axum_helpers::server::{ShutdownCoordinator, create_production_app, create_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_users::{LoggingEventHandler, NotificationSubscriber};
use tracing::{error, info, warn};

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment, &config.log_level);
    stream_worker::init_metrics();

    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    if config.run_migrations {
        database::postgres::run_migrations::<migration::Migrator>(&db, &config.app.name)
            .await
            .map_err(|e| eyre::eyre!("Migrations failed: {}", e))?;
    }

    let redis_url = config.redis.as_ref().map(|r| r.url().to_string());
    let redis = match &redis_url {
        Some(url) => Some(
            database::redis::connect_with_retry(url, None)
                .await
                .map_err(|e| eyre::eyre!("Redis connection failed: {}", e))?,
        ),
        None => {
            warn!("REDIS_URL not set, user events will be logged instead of published");
            None
        }
    };

    let users = api::users::service(&config, &db, redis.as_ref());
    let state = AppState {
        config,
        db,
        redis,
        users,
    };
    let coordinator = ShutdownCoordinator::new();

    // The consumer gets its own connection so a slow read never queues behind requests
    let worker = match &redis_url {
        Some(url) => {
            let consumer_redis = database::redis::connect_with_retry(url, None)
                .await
                .map_err(|e| eyre::eyre!("Redis connection failed: {}", e))?;

            NotificationSubscriber::new(consumer_redis, LoggingEventHandler)
                .with_config(state.config.notifications.worker_config())
                .with_enabled(state.config.notifications.enable_consumer)
                .start(coordinator.subscribe())
                .await
                .map_err(|e| eyre::eyre!("Notification subscriber failed to start: {}", e))?
        }
        None => None,
    };

    let router = create_router::<openapi::ApiDoc>(api::routes(&state), &state.config.server)?;

    // - /health: user gateway liveness
    // - /ready: postgres + redis readiness
    // - /metrics: prometheus exposition
    let app = router.merge(api::ops_router(state.clone()));

    let server_config = state.config.server.clone();
    info!(
        app = %state.config.app.name,
        version = %state.config.app.version,
        "Starting users API"
    );

    create_production_app(app, &server_config, coordinator, async move {
        if let Some(handle) = worker {
            match handle.await {
                Ok(Ok(())) => info!("Notification subscriber stopped"),
                Ok(Err(e)) => error!("Notification subscriber failed: {}", e),
                Err(e) => error!("Notification subscriber task panicked: {}", e),
            }
        }

        info!("Shutting down: closing database connections");
        match state.db.close().await {
            Ok(_) => info!("PostgreSQL connection closed successfully"),
            Err(e) => error!("Error closing PostgreSQL: {}", e),
        }
        // Redis ConnectionManager closes automatically on drop
        drop(state.redis);
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Users API shutdown complete");
    Ok(())
}
