use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;

use vidgen::application::ports::{JobRepository, MediaStore};
use vidgen::application::services::{ProviderRegistry, ResultPersister, TaskOrchestrator};
use vidgen::infrastructure::download::HttpMediaDownloader;
use vidgen::infrastructure::observability::{TracingConfig, init_tracing};
use vidgen::infrastructure::persistence::{
    InMemoryJobRepository, PgJobRepository, create_pool, run_migrations,
};
use vidgen::infrastructure::providers::ProviderFactory;
use vidgen::infrastructure::storage::LocalMediaStore;
use vidgen::presentation::config::DatabaseSettings;
use vidgen::presentation::{AppState, Environment, Settings, create_router};

async fn job_repository(settings: &DatabaseSettings) -> anyhow::Result<Arc<dyn JobRepository>> {
    match &settings.url {
        Some(url) => {
            let pool = create_pool(url, settings.max_connections)
                .await
                .context("connecting to postgres")?;
            run_migrations(&pool).await.context("running migrations")?;
            tracing::info!("Using postgres job store");
            Ok(Arc::new(PgJobRepository::new(pool)))
        }
        None => {
            tracing::warn!("No database URL configured; jobs are kept in memory only");
            Ok(Arc::new(InMemoryJobRepository::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("loading configuration")?;

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("invalid server address")?;

    init_tracing(
        &TracingConfig::new(
            environment.as_str(),
            settings.logging.json || TracingConfig::default().json_format,
            settings.logging.level.as_deref(),
        ),
        addr,
    );

    let repository = job_repository(&settings.database).await?;

    let adapters = ProviderFactory::create_all(&settings.providers)?;
    let registry = Arc::new(ProviderRegistry::new(adapters));

    let media_store: Arc<dyn MediaStore> = Arc::new(
        LocalMediaStore::new(PathBuf::from(&settings.storage.media_dir))
            .context("preparing media directory")?,
    );
    let downloader = Arc::new(
        HttpMediaDownloader::new(Duration::from_secs(settings.download.timeout_secs))
            .context("building download client")?,
    );
    let persister = Arc::new(ResultPersister::new(
        downloader,
        Arc::clone(&media_store),
        settings.download_policy(),
    ));

    let orchestrator = Arc::new(TaskOrchestrator::start(
        registry,
        repository,
        persister,
        settings.orchestrator_config(),
    ));

    let report = orchestrator
        .resume_in_flight()
        .await
        .context("resuming in-flight jobs")?;
    tracing::info!(
        requeued = report.requeued,
        abandoned = report.abandoned,
        "In-flight jobs resumed"
    );

    let state = AppState {
        orchestrator: Arc::clone(&orchestrator),
        media_store,
        providers: settings.providers.clone(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    orchestrator.shutdown();
    Ok(())
}
