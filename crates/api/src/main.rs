use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use stockhistory_api::app::{build_app, AppServices};
use stockhistory_infra::{PostgresMigrator, SchedulerConfig, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockhistory_observability::init();

    let config = ServiceConfig::from_env().context("invalid service configuration")?;

    if config.revert_migration {
        return revert_last_migration(&config).await;
    }

    let services = match &config.database_url {
        Some(url) => {
            let pool = connect(url).await?;

            if config.run_migrations {
                let applied = PostgresMigrator::new(pool.clone())
                    .run_pending()
                    .await
                    .context("failed to apply migrations")?;
                tracing::info!(?applied, "migrations up to date");
            }

            AppServices::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            AppServices::in_memory()
        }
    };
    let services = Arc::new(services);

    services
        .start_hooks(tokio::runtime::Handle::current())
        .context("failed to start event hooks")?;
    let scheduler = services
        .scheduler(SchedulerConfig::default().with_interval(config.tick))
        .spawn();

    let app = build_app(config.jwt_secret.clone(), services.clone());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
        .context("server error")?;

    tracing::info!("shutting down");
    scheduler.shutdown().await;

    // Joining the hook thread blocks until its in-flight event finishes.
    let hooks = services.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || hooks.stop_hooks()).await {
        tracing::error!(error = %e, "failed to stop event hooks");
    }

    Ok(())
}

async fn connect(url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await
        .context("failed to connect to the host database")
}

/// `STOCK_HISTORY_REVERT_MIGRATION=true`: roll back the newest migration and exit.
async fn revert_last_migration(config: &ServiceConfig) -> anyhow::Result<()> {
    let Some(url) = &config.database_url else {
        anyhow::bail!("reverting a migration requires DATABASE_URL");
    };

    let reverted = PostgresMigrator::new(connect(url).await?)
        .revert_last()
        .await
        .context("failed to revert migration")?;
    match reverted {
        Some(name) => tracing::info!(migration = name, "migration reverted"),
        None => tracing::info!("no applied migrations; nothing to revert"),
    }
    Ok(())
}
