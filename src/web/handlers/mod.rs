//! API handlers for the HTTP surface.

pub mod account;
pub mod feeds;
pub mod posts;

pub use account::*;
pub use feeds::*;
pub use posts::*;

use std::sync::Arc;

use crate::feed::{FeedFetch, FeedService};
use crate::{Config, Database};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database handle.
    pub db: Database,
    /// Feed fetcher used by on-demand and triggered runs.
    pub fetcher: Arc<dyn FeedFetch>,
    /// Loaded configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, fetcher: Arc<dyn FeedFetch>, config: Arc<Config>) -> Self {
        Self {
            db,
            fetcher,
            config,
        }
    }

    /// Feed pipeline service bound to this state.
    pub fn feed_service(&self) -> FeedService<'_> {
        FeedService::new(&self.db, self.fetcher.as_ref(), &self.config)
    }
}
