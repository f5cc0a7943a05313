use std::sync::Arc;

use tracing::{error, info};

use feedsync::feed::{FeedFetch, HttpFeedFetcher, SyncScheduler};
use feedsync::web::WebServer;
use feedsync::{Config, Database};

#[tokio::main]
async fn main() {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = feedsync::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedsync::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("feedsync stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> feedsync::Result<()> {
    config.validate()?;
    let config = Arc::new(config);

    info!("feedsync - feed ingestion service");

    let db = Database::open(&config.database.path).await?;
    let fetcher: Arc<dyn FeedFetch> = Arc::new(HttpFeedFetcher::new(&config.fetch)?);

    if config.sync.enabled {
        SyncScheduler::new(db.clone(), fetcher.clone(), config.clone()).spawn();
    } else {
        info!("Scheduled feed sync is disabled");
    }

    let server = WebServer::new(config.clone(), db, fetcher)?;
    info!("Server configured on {}", server.addr());

    server.run(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
