//! feedsync - RSS/Atom feed ingestion and deduplication
//!
//! Fetches RSS 2.0 and Atom feeds, extracts their items, and imports them as
//! posts owned by subscribing accounts. Each account receives at most one post
//! per feed item, however often the feed is imported.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod web;

pub use config::Config;
pub use db::{Account, AccountRepository, Database, NewAccount};
pub use error::{FeedsyncError, Result};
pub use feed::{
    FeedFetch, FeedItem, FeedService, HttpFeedFetcher, ImportScope, ImportSummary, Post,
    PostRepository, RunReport, SyncScheduler, SyncSummary,
};
