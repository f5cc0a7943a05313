//! Scheduled feed sync for feedsync.
//!
//! This module provides the background task that periodically syncs every
//! configured feed into its subscribed accounts.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

use super::fetcher::FeedFetch;
use super::service::FeedService;
use super::types::SyncSummary;
use crate::{Config, Database};

/// Background feed sync scheduler.
pub struct SyncScheduler {
    db: Database,
    fetcher: Arc<dyn FeedFetch>,
    config: Arc<Config>,
    interval: Duration,
}

impl SyncScheduler {
    /// Create a scheduler using `sync.interval_secs` from the configuration.
    pub fn new(db: Database, fetcher: Arc<dyn FeedFetch>, config: Arc<Config>) -> Self {
        let interval = Duration::from_secs(config.sync.interval_secs.max(1));
        Self {
            db,
            fetcher,
            config,
            interval,
        }
    }

    /// Sync interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the scheduler loop.
    ///
    /// The first sync starts immediately; this method never returns.
    pub async fn run(&self) {
        info!(
            "Feed sync scheduler started (interval: {} seconds)",
            self.interval.as_secs()
        );

        let mut timer = interval(self.interval);
        // No catch-up bursts after a slow sync
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            self.sync_once().await;
        }
    }

    /// Run a single sync, logging instead of returning errors.
    pub async fn sync_once(&self) -> Option<SyncSummary> {
        let service = FeedService::new(&self.db, self.fetcher.as_ref(), &self.config);
        match service.sync_all().await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!("Scheduled feed sync failed: {}", e);
                None
            }
        }
    }

    /// Spawn the scheduler as a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AccountRepository, NewAccount};
    use crate::Result;
    use async_trait::async_trait;

    struct OneItemFetcher;

    #[async_trait]
    impl FeedFetch for OneItemFetcher {
        async fn fetch_raw(&self, _url: &str) -> Result<String> {
            Ok("<rss><item><guid>A</guid><title>Hello</title></item></rss>".to_string())
        }
    }

    #[tokio::test]
    async fn test_scheduler_interval_from_config() {
        let db = Database::open_in_memory().await.unwrap();
        let mut config = Config::default();
        config.sync.interval_secs = 60;

        let scheduler = SyncScheduler::new(db, Arc::new(OneItemFetcher), Arc::new(config));
        assert_eq!(scheduler.interval(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_sync_once() {
        let db = Database::open_in_memory().await.unwrap();
        AccountRepository::new(db.pool())
            .create(&NewAccount::new("U1").with_feed_url("https://example.com/feed.xml"))
            .await
            .unwrap();

        let scheduler = SyncScheduler::new(
            db.clone(),
            Arc::new(OneItemFetcher),
            Arc::new(Config::default()),
        );

        let first = scheduler.sync_once().await.unwrap();
        assert_eq!(first.synced, 1);
        let second = scheduler.sync_once().await.unwrap();
        assert_eq!(second.synced, 0);
    }
}
