//! Request DTOs for the HTTP surface.

use serde::Deserialize;
use validator::Validate;

use super::validation::{feed_url_or_empty, no_control_chars};

/// Default page size for listings.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Maximum page size for listings.
pub const MAX_PER_PAGE: u32 = 100;

/// On-demand feed import request.
#[derive(Debug, Deserialize, Validate)]
pub struct ImportFeedRequest {
    /// Feed URL to import.
    #[validate(url(message = "Must be a valid URL"))]
    pub feed_url: String,
    /// Maximum number of items to consider.
    #[validate(range(min = 1, max = 1000, message = "Must be between 1 and 1000"))]
    pub item_limit: Option<usize>,
}

/// Feed settings update for the caller's account.
///
/// An empty `feed_url` removes the configured feed.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFeedSettingsRequest {
    /// New feed URL.
    #[validate(
        length(max = 2048, message = "Must be at most 2048 characters"),
        custom(function = "no_control_chars"),
        custom(function = "feed_url_or_empty")
    )]
    pub feed_url: Option<String>,
    /// New auto-publish preference.
    pub auto_publish_from_feed: Option<bool>,
}

/// Pagination query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    /// Page number, starting at 1.
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

impl PaginationQuery {
    /// Page number (at least 1).
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, clamped to `1..=MAX_PER_PAGE`.
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// Row offset of the first item on the page.
    pub fn offset(&self) -> i64 {
        (self.page() as i64 - 1) * self.per_page() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_request_validation() {
        let ok = ImportFeedRequest {
            feed_url: "https://example.com/feed.xml".to_string(),
            item_limit: Some(10),
        };
        assert!(ok.validate().is_ok());

        let bad_url = ImportFeedRequest {
            feed_url: "not a url".to_string(),
            item_limit: None,
        };
        assert!(bad_url.validate().is_err());

        let bad_limit = ImportFeedRequest {
            feed_url: "https://example.com/feed.xml".to_string(),
            item_limit: Some(0),
        };
        assert!(bad_limit.validate().is_err());
    }

    #[test]
    fn test_update_feed_settings_validation() {
        let clear = UpdateFeedSettingsRequest {
            feed_url: Some(String::new()),
            auto_publish_from_feed: None,
        };
        assert!(clear.validate().is_ok());

        let bad = UpdateFeedSettingsRequest {
            feed_url: Some("ftp://example.com/feed".to_string()),
            auto_publish_from_feed: Some(true),
        };
        assert!(bad.validate().is_err());

        let none = UpdateFeedSettingsRequest {
            feed_url: None,
            auto_publish_from_feed: Some(true),
        };
        assert!(none.validate().is_ok());
    }

    #[test]
    fn test_pagination_query() {
        let query = PaginationQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(query.offset(), 0);

        let query = PaginationQuery {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(query.offset(), 20);

        let query = PaginationQuery {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), MAX_PER_PAGE);
    }
}
