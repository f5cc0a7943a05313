//! Account model for feedsync.

use chrono::{DateTime, Utc};

/// An account that owns imported posts.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Account ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Configured feed URL, if any.
    pub feed_url: Option<String>,
    /// Whether items imported from the feed are published immediately.
    pub auto_publish_from_feed: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// New account for creation.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub feed_url: Option<String>,
    /// Auto-publish preference.
    pub auto_publish_from_feed: bool,
}

impl NewAccount {
    /// Create a new account without a feed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feed_url: None,
            auto_publish_from_feed: false,
        }
    }

    /// Set the feed URL.
    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = Some(url.into());
        self
    }

    /// Set the auto-publish preference.
    pub fn with_auto_publish(mut self, enabled: bool) -> Self {
        self.auto_publish_from_feed = enabled;
        self
    }
}

/// Feed settings update for an account.
///
/// `feed_url: Some(None)` clears the configured feed.
#[derive(Debug, Clone, Default)]
pub struct AccountFeedSettings {
    /// New feed URL.
    pub feed_url: Option<Option<String>>,
    /// New auto-publish preference.
    pub auto_publish_from_feed: Option<bool>,
}

impl AccountFeedSettings {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the feed URL.
    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = Some(Some(url.into()));
        self
    }

    /// Remove the feed URL.
    pub fn clear_feed_url(mut self) -> Self {
        self.feed_url = Some(None);
        self
    }

    /// Set the auto-publish preference.
    pub fn with_auto_publish(mut self, enabled: bool) -> Self {
        self.auto_publish_from_feed = Some(enabled);
        self
    }

    /// Check if the update is empty.
    pub fn is_empty(&self) -> bool {
        self.feed_url.is_none() && self.auto_publish_from_feed.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_builder() {
        let account = NewAccount::new("Studio")
            .with_feed_url("https://example.com/feed.xml")
            .with_auto_publish(true);
        assert_eq!(account.name, "Studio");
        assert_eq!(
            account.feed_url.as_deref(),
            Some("https://example.com/feed.xml")
        );
        assert!(account.auto_publish_from_feed);
    }

    #[test]
    fn test_feed_settings_empty() {
        assert!(AccountFeedSettings::new().is_empty());
        assert!(!AccountFeedSettings::new().with_auto_publish(false).is_empty());
        assert_eq!(
            AccountFeedSettings::new().clear_feed_url().feed_url,
            Some(None)
        );
    }
}
