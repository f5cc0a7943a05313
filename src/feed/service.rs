//! Feed pipeline service for feedsync.
//!
//! One pipeline (fetch, parse, materialize) with two entry points: an
//! on-demand import of one feed for one account, and a scheduled sync of
//! every configured feed for every subscribed account.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, error, info, warn};

use super::fetcher::{fetch_document, validate_url, FeedFetch};
use super::materializer::{Destination, Materializer};
use super::parser::parse_items;
use super::types::{FeedItem, FeedSource, ImportScope, ImportSummary, RunReport, SyncSummary};
use crate::db::{Account, AccountRepository, Database};
use crate::{Config, FeedsyncError, Result};

/// Group accounts by their exact feed URL.
///
/// Sources are ordered by URL; owners within a source by account ID.
/// Accounts without a feed URL are ignored.
pub fn group_by_feed(accounts: &[Account]) -> Vec<FeedSource> {
    let mut sources: BTreeMap<&str, FeedSource> = BTreeMap::new();

    for account in accounts {
        let Some(url) = account.feed_url.as_deref().filter(|u| !u.is_empty()) else {
            continue;
        };
        sources
            .entry(url)
            .or_insert_with(|| FeedSource::new(url))
            .owner_account_ids
            .push(account.id);
    }

    sources
        .into_values()
        .map(|mut source| {
            source.owner_account_ids.sort_unstable();
            source
        })
        .collect()
}

/// Service for feed pipeline runs.
pub struct FeedService<'a> {
    db: &'a Database,
    fetcher: &'a dyn FeedFetch,
    config: &'a Config,
}

impl<'a> FeedService<'a> {
    /// Create a new FeedService.
    pub fn new(db: &'a Database, fetcher: &'a dyn FeedFetch, config: &'a Config) -> Self {
        Self {
            db,
            fetcher,
            config,
        }
    }

    /// Run the pipeline for a scope.
    pub async fn run(&self, scope: ImportScope) -> Result<RunReport> {
        match scope {
            ImportScope::SingleAccount {
                account_id,
                feed_url,
                item_limit,
            } => self
                .import_feed(account_id, &feed_url, item_limit)
                .await
                .map(RunReport::Import),
            ImportScope::AllSubscribed => self.sync_all().await.map(RunReport::Sync),
        }
    }

    /// Item limit actually applied to an on-demand import.
    ///
    /// Defaults to `import.default_item_limit` and is clamped to
    /// `1..=import.max_item_limit`.
    pub fn effective_item_limit(&self, requested: Option<usize>) -> usize {
        let import = &self.config.import;
        requested
            .unwrap_or(import.default_item_limit)
            .clamp(1, import.max_item_limit.max(1))
    }

    /// Import one feed into one account.
    ///
    /// Fails only when no work could be attempted: an invalid URL, an unknown
    /// account, an unreachable feed, an HTML page, or a feed without items.
    /// Per-item failures are reported in the summary counts.
    pub async fn import_feed(
        &self,
        account_id: i64,
        feed_url: &str,
        item_limit: Option<usize>,
    ) -> Result<ImportSummary> {
        let feed_url = feed_url.trim();
        validate_url(feed_url, self.config.fetch.allow_private_hosts)?;

        let account = AccountRepository::new(self.db.pool())
            .get_by_id(account_id)
            .await?
            .ok_or_else(|| FeedsyncError::NotFound("account".to_string()))?;

        let limit = self.effective_item_limit(item_limit);
        let items = self.fetch_items(feed_url, limit).await?;

        let mut materializer =
            Materializer::load(self.db.pool(), Destination::from(&account), feed_url).await?;
        let summary = materializer.materialize(&items).await.summary();

        info!(
            "Imported {} of {} item(s) from {} for account {} ({} skipped, {} failed)",
            summary.imported, summary.total, feed_url, account.id, summary.skipped, summary.failed
        );

        Ok(summary)
    }

    /// Sync every configured feed into every subscribed account.
    ///
    /// Each distinct URL is fetched once. A feed that cannot be fetched or
    /// parsed is logged and skipped; the run continues with the next one.
    pub async fn sync_all(&self) -> Result<SyncSummary> {
        let accounts = AccountRepository::new(self.db.pool())
            .list_with_feed_url()
            .await?;
        let sources = group_by_feed(&accounts);
        let destinations: HashMap<i64, Destination> = accounts
            .iter()
            .map(|a| (a.id, Destination::from(a)))
            .collect();

        let mut summary = SyncSummary {
            feeds: sources.len(),
            ..SyncSummary::default()
        };

        for source in &sources {
            let items = match self
                .fetch_items(&source.url, self.config.sync.max_items_per_feed)
                .await
            {
                Ok(items) => items,
                Err(e) if e.is_feed_failure() => {
                    warn!("Skipping feed {}: {}", source.url, e);
                    summary.failed_feeds += 1;
                    continue;
                }
                Err(e) => {
                    error!("Unexpected failure syncing feed {}: {}", source.url, e);
                    summary.failed_feeds += 1;
                    continue;
                }
            };

            for account_id in &source.owner_account_ids {
                let Some(destination) = destinations.get(account_id).copied() else {
                    continue;
                };
                summary.synced += self.sync_account(destination, &source.url, &items).await;
            }
        }

        info!(
            "Sync finished: {} new post(s) from {} feed(s), {} feed(s) failed",
            summary.synced, summary.feeds, summary.failed_feeds
        );

        Ok(summary)
    }

    /// Materialize a fetched feed into one account; returns posts created.
    async fn sync_account(&self, destination: Destination, url: &str, items: &[FeedItem]) -> usize {
        let mut materializer = match Materializer::load(self.db.pool(), destination, url).await {
            Ok(m) => m,
            Err(e) => {
                error!(
                    "Failed to prepare sync of {} for account {}: {}",
                    url, destination.account_id, e
                );
                return 0;
            }
        };

        let tally = materializer.materialize(items).await;
        if tally.imported > 0 {
            info!(
                "Feed {} synced for account {}: {} new post(s)",
                url, destination.account_id, tally.imported
            );
        } else {
            debug!(
                "Feed {} synced for account {}: no new posts",
                url, destination.account_id
            );
        }
        tally.imported
    }

    /// Fetch a feed and parse at most `limit` items.
    async fn fetch_items(&self, url: &str, limit: usize) -> Result<Vec<FeedItem>> {
        let body = fetch_document(self.fetcher, url).await?;
        let items: Vec<FeedItem> = parse_items(&body).take(limit).collect();
        debug!("Parsed {} item(s) from {}", items.len(), url);

        if items.is_empty() {
            return Err(FeedsyncError::NoItemsFound(format!(
                "{url} has no <item> or <entry> elements"
            )));
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewAccount;
    use async_trait::async_trait;
    use chrono::Utc;

    struct StubFetcher;

    #[async_trait]
    impl FeedFetch for StubFetcher {
        async fn fetch_raw(&self, url: &str) -> Result<String> {
            match url {
                "https://example.com/empty.xml" => Ok("<rss><channel/></rss>".to_string()),
                "https://example.com/down.xml" => Err(FeedsyncError::Fetch("503".to_string())),
                _ => Ok("<rss><channel>\
                    <item><guid>1</guid><title>One</title></item>\
                    <item><guid>2</guid><title>Two</title></item>\
                    <item><guid>3</guid><title>Three</title></item>\
                    </channel></rss>"
                    .to_string()),
            }
        }
    }

    fn account(id: i64, feed_url: Option<&str>) -> Account {
        Account {
            id,
            name: format!("u{id}"),
            feed_url: feed_url.map(str::to_string),
            auto_publish_from_feed: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_group_by_feed() {
        let accounts = vec![
            account(3, Some("https://b.example/feed")),
            account(1, Some("https://a.example/feed")),
            account(2, None),
            account(4, Some("https://a.example/feed")),
            account(5, Some("")),
            account(6, Some("https://a.example/feed/")),
        ];

        let sources = group_by_feed(&accounts);
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].url, "https://a.example/feed");
        assert_eq!(sources[0].owner_account_ids, vec![1, 4]);
        assert_eq!(sources[1].url, "https://a.example/feed/");
        assert_eq!(sources[2].owner_account_ids, vec![3]);
    }

    #[tokio::test]
    async fn test_effective_item_limit() {
        let db = Database::open_in_memory().await.unwrap();
        let config = Config::default();
        let service = FeedService::new(&db, &StubFetcher, &config);

        assert_eq!(
            service.effective_item_limit(None),
            config.import.default_item_limit
        );
        assert_eq!(service.effective_item_limit(Some(5)), 5);
        assert_eq!(service.effective_item_limit(Some(0)), 1);
        assert_eq!(
            service.effective_item_limit(Some(100_000)),
            config.import.max_item_limit
        );
    }

    #[tokio::test]
    async fn test_import_feed_respects_limit() {
        let db = Database::open_in_memory().await.unwrap();
        let config = Config::default();
        let account = AccountRepository::new(db.pool())
            .create(&NewAccount::new("U1"))
            .await
            .unwrap();
        let service = FeedService::new(&db, &StubFetcher, &config);

        let summary = service
            .import_feed(account.id, "https://example.com/feed.xml", Some(2))
            .await
            .unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.total, 2);
    }

    #[tokio::test]
    async fn test_import_feed_errors() {
        let db = Database::open_in_memory().await.unwrap();
        let config = Config::default();
        let account = AccountRepository::new(db.pool())
            .create(&NewAccount::new("U1"))
            .await
            .unwrap();
        let service = FeedService::new(&db, &StubFetcher, &config);

        let result = service
            .import_feed(account.id, "https://example.com/empty.xml", None)
            .await;
        assert!(matches!(result, Err(FeedsyncError::NoItemsFound(_))));

        let result = service
            .import_feed(account.id, "https://example.com/down.xml", None)
            .await;
        assert!(matches!(result, Err(FeedsyncError::Fetch(_))));

        let result = service
            .import_feed(999, "https://example.com/feed.xml", None)
            .await;
        assert!(matches!(result, Err(FeedsyncError::NotFound(_))));

        let result = service
            .import_feed(account.id, "http://127.0.0.1/feed.xml", None)
            .await;
        assert!(matches!(result, Err(FeedsyncError::Validation(_))));
    }

    #[tokio::test]
    async fn test_run_dispatches_scope() {
        let db = Database::open_in_memory().await.unwrap();
        let config = Config::default();
        let account = AccountRepository::new(db.pool())
            .create(&NewAccount::new("U1").with_feed_url("https://example.com/feed.xml"))
            .await
            .unwrap();
        let service = FeedService::new(&db, &StubFetcher, &config);

        let report = service
            .run(ImportScope::SingleAccount {
                account_id: account.id,
                feed_url: "https://example.com/feed.xml".to_string(),
                item_limit: Some(1),
            })
            .await
            .unwrap();
        assert!(matches!(report, RunReport::Import(s) if s.imported == 1));

        let report = service.run(ImportScope::AllSubscribed).await.unwrap();
        assert_eq!(
            report,
            RunReport::Sync(SyncSummary {
                synced: 2,
                feeds: 1,
                failed_feeds: 0,
            })
        );
    }

    #[tokio::test]
    async fn test_sync_all_skips_failed_feeds() {
        let db = Database::open_in_memory().await.unwrap();
        let config = Config::default();
        let repo = AccountRepository::new(db.pool());
        repo.create(&NewAccount::new("down").with_feed_url("https://example.com/down.xml"))
            .await
            .unwrap();
        repo.create(&NewAccount::new("empty").with_feed_url("https://example.com/empty.xml"))
            .await
            .unwrap();
        repo.create(&NewAccount::new("ok").with_feed_url("https://example.com/feed.xml"))
            .await
            .unwrap();
        let service = FeedService::new(&db, &StubFetcher, &config);

        let summary = service.sync_all().await.unwrap();
        assert_eq!(summary.feeds, 3);
        assert_eq!(summary.failed_feeds, 2);
        assert_eq!(summary.synced, 3);
    }
}
