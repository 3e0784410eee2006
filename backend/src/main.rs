use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;

use backend::store::ReplayStore;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = backend::config::Config::try_from(backend::config::Cli::parse())?;

    let registry = tracing_subscriber::Registry::default()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            config.log_level,
        ))
        .with(tracing_subscriber::filter::filter_fn(|meta| {
            meta.target().contains("backend") || meta.target().contains("analysis")
        }));
    tracing::subscriber::set_global_default(registry)?;

    tracing::info!("Starting...");

    let store: Arc<dyn ReplayStore> = match config.database_url.as_deref() {
        Some(url) => {
            let store = backend::store::DieselStore::connect(url, config.database_max_connections)?;

            tracing::info!("Applying Migrations");
            store.run_migrations().await?;
            tracing::info!("Completed Migrations");

            Arc::new(store)
        }
        None => {
            tracing::warn!("No database configured, replay entries only live in memory");
            Arc::new(backend::store::MemoryStore::new())
        }
    };

    if !tokio::fs::try_exists(&config.ingest.watch_dir).await.unwrap_or(false) {
        tokio::fs::create_dir_all(&config.ingest.watch_dir).await?;
    }

    let decoder = Arc::new(backend::decoder::ExternalDecoder::new(config.decoder.clone()));
    let worker = backend::ingest::IngestWorker::new(config.ingest.clone(), decoder, store.clone());

    let shutdown = CancellationToken::new();
    let ingest_task = tokio::task::spawn({
        let shutdown = shutdown.clone();
        async move { worker.run(shutdown).await }
    });

    let router = axum::Router::new().nest(
        "/api",
        backend::api::router(Arc::new(backend::api::ApiState {
            store,
            data_root: config.data_root.clone(),
        })),
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "Listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    // Lets an in-flight tick finish its cleanup.
    shutdown.cancel();
    if let Err(e) = ingest_task.await {
        tracing::error!("Ingestion task failed: {}", e);
    }

    tracing::info!("Stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Listening for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutting down");
    shutdown.cancel();
}
