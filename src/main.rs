use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use contacts_api::auth::JwtAuthenticator;
use contacts_api::config::{Config, LogFormat, StoreKind};
use contacts_api::repository::{ContactStore, MemoryContactStore, PgContactStore};
use contacts_api::{router, AppState};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;
    init_logging(config.log_format);
    tracing::debug!(?config, "Loaded configuration");

    let store: Arc<dyn ContactStore> = match config.store {
        StoreKind::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(5))
                .connect(database_url)
                .await
                .context("connect to database")?;
            let store = PgContactStore::new(pool);
            if config.run_migrations {
                store.migrate().await.context("run migrations")?;
            }
            Arc::new(store)
        }
        StoreKind::Memory => {
            tracing::warn!("CONTACTS_STORE=memory; contacts are not persisted");
            Arc::new(MemoryContactStore::new())
        }
    };

    let authenticator = Arc::new(JwtAuthenticator::new(&config.jwt_secret));
    let app = router(AppState::new(store, authenticator));

    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("bind {}", config.http_addr))?;
    tracing::info!(addr = %config.http_addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
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
    tracing::info!("Shutdown signal received");
}
