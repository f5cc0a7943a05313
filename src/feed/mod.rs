//! Feed ingestion module for feedsync.
//!
//! This module fetches RSS/Atom feeds, parses their items, and materializes
//! them as per-account posts, deduplicated by external ID.

pub mod date;
pub mod fetcher;
pub mod html;
pub mod materializer;
pub mod parser;
pub mod repository;
pub mod service;
pub mod types;
pub mod updater;

pub use fetcher::{
    ensure_feed_document, fetch_document, validate_url, FeedFetch, HttpFeedFetcher,
};
pub use materializer::{Destination, ImportTally, ItemOutcome, Materializer, SlugGenerator};
pub use parser::{parse_items, FeedFormat, FeedItems};
pub use repository::PostRepository;
pub use service::{group_by_feed, FeedService};
pub use types::{
    FeedItem, FeedSource, ImportScope, ImportSummary, NewPost, Platform, Post, PostStatus,
    RunReport, SyncSummary, EXCERPT_LENGTH, UNTITLED,
};
pub use updater::SyncScheduler;
