use std::sync::Arc;

use anyhow::Context;

use inventaris_api::app::services::AppServices;
use inventaris_infra::replica::{FirebaseRestSink, NoopReplica, ReplicaSink, Replicator, SyncWorker};
use inventaris_infra::store::{InMemoryStore, PostgresStore, Store};
use inventaris_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    inventaris_observability::init(config.log_format);

    let store: Arc<dyn Store> = match &config.database {
        Some(db) => {
            let store = PostgresStore::connect(&db.url, db.max_connections)
                .await
                .context("failed to connect to postgres")?;
            store.migrate().await.context("failed to apply migrations")?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let sink: Arc<dyn ReplicaSink> = match &config.firebase {
        Some(firebase) => Arc::new(
            FirebaseRestSink::new(firebase).context("failed to build firebase client")?,
        ),
        None => Arc::new(NoopReplica),
    };

    let replicator = Replicator::new(store.clone(), sink);
    let (dispatcher, worker) = SyncWorker::spawn(replicator.clone());
    let services = Arc::new(AppServices::new(store, replicator, dispatcher));

    let app = inventaris_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    worker.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
