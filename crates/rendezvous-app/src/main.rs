use std::path::Path;
use std::sync::Arc;

use salvo::conn::TcpListener;
use salvo::{Listener, Router};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

use rendezvous_app::app::api::routes;
use rendezvous_app::config::{ConfigHandler, Settings, StorageBackend};
use rendezvous_app::engine_handler::EngineHandler;
use rendezvous_core::config::load_config;
use rendezvous_db::db::AppointmentStore;
use rendezvous_db::db::connection::create_pool;
use rendezvous_db::db::memory::MemoryStore;
use rendezvous_db::db::migrate::run_pending_migrations;
use rendezvous_db::db::postgres::PgStore;
use rendezvous_service::SchedulingEngine;
use rendezvous_service::catalog::{Catalog, FileCatalog};
use rendezvous_service::events::{BroadcastEventSink, EventSink, LogEventSink};

const EVENT_BUFFER: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Rendezvous appointment server");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    // Lookups re-read the file; this only validates it once up front.
    let catalog = Catalog::load(Path::new(&config.catalog.path))?;
    tracing::info!(
        path = %config.catalog.path,
        organizations = catalog.organization_count(),
        "Catalog validated"
    );

    let store = open_store(&config).await?;
    let reference = Arc::new(FileCatalog::new(&config.catalog.path));
    let engine = SchedulingEngine::new(
        reference.clone(),
        reference,
        store,
        event_sink(),
        config.booking.clone(),
    );

    let bind_addr = config.server.bind_addr();
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = Router::new()
        .hoop(ConfigHandler {
            settings: config.clone(),
        })
        .hoop(EngineHandler { engine })
        .push(routes());

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    Ok(())
}

async fn open_store(config: &Settings) -> anyhow::Result<Arc<dyn AppointmentStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store, appointments are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            run_pending_migrations(&config.database.url).await?;
            let pool = create_pool(
                &config.database.url,
                u32::from(config.database.max_connections),
            )
            .await?;
            tracing::info!("Database connection pool created.");
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

/// Events go to a broadcast channel; one subscriber writes them to the log.
fn event_sink() -> Arc<dyn EventSink> {
    let sink = BroadcastEventSink::new(EVENT_BUFFER);
    let mut events = sink.subscribe();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => LogEventSink.publish(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    Arc::new(sink)
}
