//! Feed and post types for feedsync.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Title used when a feed item has none.
pub const UNTITLED: &str = "Untitled";

/// Maximum excerpt length in characters.
pub const EXCERPT_LENGTH: usize = 200;

/// Platform a feed is hosted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// A video channel feed.
    Youtube,
    /// Any other RSS or Atom feed.
    Rss,
}

impl Platform {
    /// Derive the platform from a feed URL.
    pub fn from_feed_url(url: &str) -> Self {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));

        match host {
            Some(host) if is_youtube_host(&host) => Platform::Youtube,
            Some(_) => Platform::Rss,
            None => {
                let lower = url.to_ascii_lowercase();
                if lower.contains("youtube.com/") || lower.contains("youtu.be/") {
                    Platform::Youtube
                } else {
                    Platform::Rss
                }
            }
        }
    }

    /// Database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Rss => "rss",
        }
    }
}

fn is_youtube_host(host: &str) -> bool {
    host == "youtube.com"
        || host.ends_with(".youtube.com")
        || host == "youtu.be"
        || host == "youtube-nocookie.com"
        || host.ends_with(".youtube-nocookie.com")
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(Platform::Youtube),
            "rss" => Ok(Platform::Rss),
            _ => Err(format!("unknown platform: {s}")),
        }
    }
}

/// Publication status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Waiting for manual review.
    Draft,
    /// Publicly visible.
    Published,
}

impl PostStatus {
    /// Database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            _ => Err(format!("unknown post status: {s}")),
        }
    }
}

/// One externally hosted feed and the accounts subscribed to it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSource {
    /// Feed URL, compared exactly.
    pub url: String,
    /// Accounts with this URL configured, in ascending ID order.
    pub owner_account_ids: Vec<i64>,
}

impl FeedSource {
    /// Create a source with no owners yet.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            owner_account_ids: Vec::new(),
        }
    }
}

/// One entry parsed out of a feed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    /// Item title (may be empty).
    pub title: String,
    /// Item link (may be empty).
    pub link: String,
    /// RSS guid or Atom id (may be empty).
    pub guid: String,
    /// When the item was published.
    pub published_at: Option<DateTime<Utc>>,
    /// Description or summary.
    pub summary: String,
    /// Full HTML body, falling back to the summary.
    pub body_html: String,
    /// First media URL from `media:content` or `enclosure`.
    pub media_url: Option<String>,
}

impl FeedItem {
    /// Deduplication key: the guid if present, else the link.
    ///
    /// An empty result means the item cannot be addressed.
    pub fn external_id(&self) -> &str {
        if !self.guid.is_empty() {
            &self.guid
        } else {
            &self.link
        }
    }
}

/// An imported post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    /// Post ID.
    pub id: i64,
    /// Owning account.
    pub owner_account_id: i64,
    /// Title.
    pub title: String,
    /// URL slug, unique per account.
    pub slug: String,
    /// HTML body.
    pub content: String,
    /// Plain-text excerpt.
    pub excerpt: String,
    /// Featured image.
    pub featured_image_url: Option<String>,
    /// Publication status.
    pub status: PostStatus,
    /// Feed the post was imported from.
    pub source_feed_url: String,
    /// Platform of the source feed.
    pub source_platform: Platform,
    /// Deduplication key.
    pub external_id: String,
    /// Set only when the post is published.
    pub published_at: Option<DateTime<Utc>>,
    /// When the post row was created.
    pub created_at: DateTime<Utc>,
}

/// New post for creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    /// Owning account.
    pub owner_account_id: i64,
    /// Title.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// HTML body.
    pub content: String,
    /// Plain-text excerpt.
    pub excerpt: String,
    /// Featured image.
    pub featured_image_url: Option<String>,
    /// Publication status.
    pub status: PostStatus,
    /// Source feed URL.
    pub source_feed_url: String,
    /// Source platform.
    pub source_platform: Platform,
    /// Deduplication key.
    pub external_id: String,
    /// Publication time.
    pub published_at: Option<DateTime<Utc>>,
}

/// Which accounts a pipeline run covers.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportScope {
    /// On-demand import of one feed for one account.
    SingleAccount {
        /// Account receiving the posts.
        account_id: i64,
        /// Feed to import.
        feed_url: String,
        /// Maximum number of items to consider (config default when None).
        item_limit: Option<usize>,
    },
    /// Scheduled sync of every configured feed for every subscribed account.
    AllSubscribed,
}

/// Result of an on-demand import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Posts created.
    pub imported: usize,
    /// Items skipped for a missing id or as duplicates.
    pub skipped: usize,
    /// Items whose insert failed.
    pub failed: usize,
    /// Items considered.
    pub total: usize,
}

/// Result of a scheduled sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Posts created across all accounts and feeds.
    pub synced: usize,
    /// Distinct feed URLs processed.
    pub feeds: usize,
    /// Feed URLs that could not be fetched or parsed.
    pub failed_feeds: usize,
}

/// Result of any pipeline run.
///
/// Serializes as the inner summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RunReport {
    /// Single-account run.
    Import(ImportSummary),
    /// All-subscribed run.
    Sync(SyncSummary),
}
