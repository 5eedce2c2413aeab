//! Retreat Ops
//!
//! Main application entry point: loads configuration, selects the storage
//! backend, wires the services, and runs the scheduler sweep loop.

use std::sync::Arc;

use tracing::info;

use retreat_ops::{
    config::{DatabaseBackend, Settings},
    database::{connection, Repositories},
    services::{ServiceFactory, WebhookTransport},
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard must live until shutdown
    let _guard = logging::init_logging(&settings.logging)?;

    info!("Starting retreat-ops engine...");

    // Select the storage backend once; nothing downstream branches on it
    let repositories = match settings.database.backend {
        DatabaseBackend::Postgres => {
            info!("Connecting to database...");
            let pool_config = connection::PoolConfig {
                url: settings.database.url.clone(),
                max_connections: settings.database.max_connections,
                min_connections: settings.database.min_connections,
                ..Default::default()
            };
            let pool = connection::create_pool(&pool_config).await?;

            connection::run_migrations(&pool).await?;
            Repositories::postgres(pool)
        }
        DatabaseBackend::Fixture => {
            info!("Using in-memory fixture backend");
            Repositories::fixture()
        }
    };

    // Initialize services
    let transport = Arc::new(WebhookTransport::new(&settings.notifications)?);
    let services = ServiceFactory::new(&settings, repositories, transport);

    info!("retreat-ops engine is ready");

    // The sweep loop is the only background process
    services.scheduler.clone().run().await;

    Ok(())
}
