//! Post materializer.
//!
//! Turns parsed feed items into posts for one destination account. Each item
//! ends in exactly one [`ItemOutcome`]; a failing item is logged and counted
//! and never stops the rest of the run.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use super::html::{excerpt, first_img_src, slugify};
use super::repository::PostRepository;
use super::types::{FeedItem, ImportSummary, NewPost, Platform, Post, PostStatus, UNTITLED};
use crate::db::{Account, DbPool};
use crate::{FeedsyncError, Result};

/// The account a feed's items are materialized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    /// Owning account.
    pub account_id: i64,
    /// The account's auto-publish preference, read once per run.
    pub auto_publish: bool,
}

impl From<&Account> for Destination {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            auto_publish: account.auto_publish_from_feed,
        }
    }
}

/// Terminal state of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A post was created.
    Imported,
    /// Neither guid nor link was present.
    SkippedNoId,
    /// The account already has a post with this external ID.
    SkippedDuplicate,
    /// Persisting the post failed.
    Failed,
}

/// Per-run count of item outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportTally {
    pub imported: usize,
    pub skipped_no_id: usize,
    pub skipped_duplicate: usize,
    pub failed: usize,
    pub total: usize,
}

impl ImportTally {
    /// Count one outcome.
    pub fn record(&mut self, outcome: ItemOutcome) {
        self.total += 1;
        match outcome {
            ItemOutcome::Imported => self.imported += 1,
            ItemOutcome::SkippedNoId => self.skipped_no_id += 1,
            ItemOutcome::SkippedDuplicate => self.skipped_duplicate += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }

    /// Items skipped for any reason.
    pub fn skipped(&self) -> usize {
        self.skipped_no_id + self.skipped_duplicate
    }

    /// Caller-facing summary.
    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            imported: self.imported,
            skipped: self.skipped(),
            failed: self.failed,
            total: self.total,
        }
    }
}

/// Slugs tried for one item before its insert counts as failed.
const MAX_SLUG_ATTEMPTS: usize = 32;

/// Generates `<title>-<millis>` slugs that never repeat within a run.
///
/// When two slugs would share a millisecond, a counter is appended.
#[derive(Debug, Default)]
pub struct SlugGenerator {
    last_millis: i64,
    counter: u32,
}

impl SlugGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug for `title` at `now`.
    pub fn generate(&mut self, title: &str, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis().max(self.last_millis);
        let base = slugify(title);

        if millis == self.last_millis {
            self.counter += 1;
            format!("{base}-{millis}-{}", self.counter)
        } else {
            self.last_millis = millis;
            self.counter = 0;
            format!("{base}-{millis}")
        }
    }
}

/// Materializes items from one feed into one account.
pub struct Materializer<'a> {
    posts: PostRepository<'a>,
    destination: Destination,
    source_feed_url: &'a str,
    platform: Platform,
    existing: HashSet<String>,
    slugs: SlugGenerator,
}

impl<'a> Materializer<'a> {
    /// Create a materializer with an already loaded set of external IDs.
    pub fn new(
        pool: &'a DbPool,
        destination: Destination,
        source_feed_url: &'a str,
        existing: HashSet<String>,
    ) -> Self {
        Self {
            posts: PostRepository::new(pool),
            destination,
            source_feed_url,
            platform: Platform::from_feed_url(source_feed_url),
            existing,
            slugs: SlugGenerator::new(),
        }
    }

    /// Create a materializer, loading the account's external IDs.
    pub async fn load(
        pool: &'a DbPool,
        destination: Destination,
        source_feed_url: &'a str,
    ) -> Result<Self> {
        let existing = PostRepository::new(pool)
            .external_ids_for_account(destination.account_id)
            .await?;
        debug!(
            "Loaded {} existing external ids for account {}",
            existing.len(),
            destination.account_id
        );
        Ok(Self::new(pool, destination, source_feed_url, existing))
    }

    /// Map an item to a new post for the destination account.
    pub fn build_post(&mut self, item: &FeedItem, now: DateTime<Utc>) -> NewPost {
        let title = if item.title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            item.title.trim().to_string()
        };

        let excerpt_source = if item.body_html.is_empty() {
            &item.summary
        } else {
            &item.body_html
        };

        let featured_image_url = item
            .media_url
            .clone()
            .or_else(|| first_img_src(&item.body_html));

        let (status, published_at) = if self.destination.auto_publish {
            (PostStatus::Published, Some(item.published_at.unwrap_or(now)))
        } else {
            (PostStatus::Draft, None)
        };

        NewPost {
            owner_account_id: self.destination.account_id,
            slug: self.slugs.generate(&title, now),
            title,
            content: item.body_html.clone(),
            excerpt: excerpt(excerpt_source),
            featured_image_url,
            status,
            source_feed_url: self.source_feed_url.to_string(),
            source_platform: self.platform,
            external_id: item.external_id().to_string(),
            published_at,
        }
    }

    /// Run one item through the state machine.
    pub async fn materialize_item(&mut self, item: &FeedItem) -> ItemOutcome {
        self.materialize_item_at(item, Utc::now()).await
    }

    async fn materialize_item_at(&mut self, item: &FeedItem, now: DateTime<Utc>) -> ItemOutcome {
        let external_id = item.external_id();
        if external_id.is_empty() {
            return ItemOutcome::SkippedNoId;
        }
        if self.existing.contains(external_id) {
            return ItemOutcome::SkippedDuplicate;
        }

        let mut post = self.build_post(item, now);
        let inserted = self.insert_with_free_slug(&mut post, now).await;
        match inserted {
            Ok(Some(_)) => {
                self.existing.insert(post.external_id);
                ItemOutcome::Imported
            }
            Ok(None) => {
                // Another run imported it after the set was loaded
                self.existing.insert(post.external_id);
                ItemOutcome::SkippedDuplicate
            }
            Err(e) => {
                error!("Account {}: {}", self.destination.account_id, e);
                ItemOutcome::Failed
            }
        }
    }

    /// Insert a post, moving to the next slug while the current one is taken.
    ///
    /// Another run for the same account may have used the slug within the
    /// same millisecond.
    async fn insert_with_free_slug(
        &mut self,
        post: &mut NewPost,
        now: DateTime<Utc>,
    ) -> Result<Option<Post>> {
        let mut attempts = 1;
        loop {
            let result = self.posts.insert_or_ignore(post).await;
            if result.is_err() && attempts < MAX_SLUG_ATTEMPTS && self.slug_taken(&post.slug).await
            {
                debug!(
                    "Slug {} taken for account {}, retrying",
                    post.slug, self.destination.account_id
                );
                post.slug = self.slugs.generate(&post.title, now);
                attempts += 1;
                continue;
            }
            return result
                .map_err(|e| FeedsyncError::Persist(format!("item {}: {}", post.external_id, e)));
        }
    }

    async fn slug_taken(&self, slug: &str) -> bool {
        self.posts
            .slug_exists(self.destination.account_id, slug)
            .await
            .unwrap_or(false)
    }

    /// Materialize a sequence of items and tally the outcomes.
    pub async fn materialize(&mut self, items: &[FeedItem]) -> ImportTally {
        let mut tally = ImportTally::default();
        for item in items {
            let outcome = self.materialize_item(item).await;
            tally.record(outcome);
        }
        tally
    }
}
