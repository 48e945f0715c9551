use std::panic;
use std::sync::Arc;

use listcast::config::Config;
use listcast::db::{ListStore, MemoryListStore, PgListStore};
use listcast::feed::{ChangeSourceListener, MemoryChangeFeed, PgChangeFeed};
use listcast::routes::create_app;
use listcast::services::ListService;
use listcast::ws::{Broadcaster, ConnectionRegistry};
use listcast::AppState;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "listcast=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    info!("Service {} running in {} mode", config.service_name, config.environment);

    let registry = ConnectionRegistry::new();
    let broadcaster = Broadcaster::new(registry.clone());
    let shutdown = CancellationToken::new();

    let (store, listener) = open_store(&config, broadcaster.clone(), shutdown.clone()).await;

    let state = Arc::new(AppState {
        lists: ListService::new(store, broadcaster),
        registry: registry.clone(),
        connection_settings: config.connection_settings(),
        ws_max_message_size: config.ws_max_message_size,
    });
    let app = create_app(state, &config.cors_origin_list());

    let listener_addr = config.server_address();
    let tcp = match tokio::net::TcpListener::bind(&listener_addr).await {
        Ok(tcp) => tcp,
        Err(e) => {
            error!("Failed to bind to {}: {}", listener_addr, e);
            return;
        }
    };

    info!("🚀 Server running on http://{}", listener_addr);
    info!("📡 WebSocket available at ws://{}/ws", listener_addr);
    info!("📚 Swagger UI available at http://{}/swagger", listener_addr);

    let signal = shutdown_signal(shutdown.clone(), registry);
    if let Err(e) = axum::serve(tcp, app).with_graceful_shutdown(signal).await {
        error!("Server error: {}", e);
    }

    shutdown.cancel();
    if let Err(e) = listener.await {
        error!("Change feed listener panicked: {}", e);
    }
    info!("Server stopped");
}

/// Pick the backing store and start the change feed listener for it
async fn open_store(
    config: &Config,
    broadcaster: Broadcaster,
    shutdown: CancellationToken,
) -> (Arc<dyn ListStore>, JoinHandle<()>) {
    let backoff = config.feed_retry_backoff();

    if let Some(db_url) = &config.db_url {
        match PgListStore::connect(db_url, config.db_max_connections).await {
            Ok(store) => {
                if config.db_run_migrations {
                    if let Err(e) = store.migrate().await {
                        error!("Failed to apply migrations: {}", e);
                    }
                }
                info!("Database initialized successfully");
                let feed = PgChangeFeed::new(store.clone(), config.feed_initial_snapshot);
                let listener = ChangeSourceListener::new(feed, broadcaster, backoff);
                let store: Arc<dyn ListStore> = Arc::new(store);
                return (store, tokio::spawn(listener.run(shutdown)));
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Falling back to the in-memory list store");
            }
        }
    } else {
        warn!("No database URL configured - using the in-memory list store");
    }

    let store = Arc::new(MemoryListStore::new());
    let feed = MemoryChangeFeed::new(store.clone(), config.feed_initial_snapshot);
    let listener = ChangeSourceListener::new(feed, broadcaster, backoff);
    let store: Arc<dyn ListStore> = store;
    (store, tokio::spawn(listener.run(shutdown)))
}

async fn shutdown_signal(shutdown: CancellationToken, registry: ConnectionRegistry) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        }
        _ = shutdown.cancelled() => {}
    }
    info!("Shutdown requested");
    shutdown.cancel();
    let closed = registry.close_all();
    info!("Closed {} WebSocket connection(s)", closed);
}
