use anyhow::{Context, Result};
use tracing::info;

use checkin_api::app::{create_app, Stores};
use checkin_api::config::{Config, StorageBackend};
use checkin_api::middleware::{init_metrics, logging::init_logging};
use persistence::JsonFileStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging)?;
    init_metrics()?;

    info!(
        backend = config.storage.backend.as_str(),
        entry_policy = ?config.codes.entry_policy,
        "Starting check-in server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let stores = open_stores(&config).await?;
    let addr = config.socket_addr()?;
    let app = create_app(config, stores)?;

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn open_stores(config: &Config) -> Result<Stores> {
    match config.storage.backend {
        StorageBackend::Postgres => {
            let db_config: persistence::db::DatabaseConfig = (&config.database).into();
            let pool = persistence::db::create_pool(&db_config)
                .await
                .context("failed to connect to database")?;

            info!("Running database migrations...");
            persistence::db::run_migrations(&pool).await?;
            info!("Migrations completed");

            Ok(Stores::postgres(pool))
        }
        StorageBackend::File => {
            let store = JsonFileStore::open(&config.storage.data_file)
                .await
                .with_context(|| {
                    format!(
                        "failed to open data file {}",
                        config.storage.data_file.display()
                    )
                })?;
            Ok(Stores::local_file(store))
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on exit");
            Ok(Stores::in_memory())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
