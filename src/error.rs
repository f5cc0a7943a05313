//! Error types for feedsync.

use thiserror::Error;

/// Common error type for feedsync.
#[derive(Error, Debug)]
pub enum FeedsyncError {
    /// Transport or HTTP failure while reaching a feed URL.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// The fetched document is an HTML page rather than a feed.
    #[error("not a feed: {0}")]
    NotAFeed(String),

    /// The document was fetched but no items could be found in it.
    #[error("no items found: {0}")]
    NoItemsFound(String),

    /// A single item could not be persisted.
    #[error("persist error: {0}")]
    Persist(String),

    /// Database error.
    ///
    /// Errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for FeedsyncError {
    fn from(e: sqlx::Error) -> Self {
        FeedsyncError::Database(e.to_string())
    }
}

impl FeedsyncError {
    /// Whether this error means a whole feed could not be used in a run.
    ///
    /// These are the failures that skip a feed URL in the scheduled path and
    /// are reported to the caller in the on-demand path.
    pub fn is_feed_failure(&self) -> bool {
        matches!(
            self,
            FeedsyncError::Fetch(_)
                | FeedsyncError::NotAFeed(_)
                | FeedsyncError::NoItemsFound(_)
                | FeedsyncError::Validation(_)
        )
    }
}

/// Result type alias for feedsync operations.
pub type Result<T> = std::result::Result<T, FeedsyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FeedsyncError::Fetch("HTTP error: 404 Not Found".to_string());
        assert_eq!(err.to_string(), "fetch error: HTTP error: 404 Not Found");
    }

    #[test]
    fn test_not_a_feed_error_display() {
        let err = FeedsyncError::NotAFeed("https://example.com".to_string());
        assert_eq!(err.to_string(), "not a feed: https://example.com");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = FeedsyncError::NotFound("account".to_string());
        assert_eq!(err.to_string(), "account not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FeedsyncError = io_err.into();
        assert!(matches!(err, FeedsyncError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_is_feed_failure() {
        assert!(FeedsyncError::Fetch("x".into()).is_feed_failure());
        assert!(FeedsyncError::NotAFeed("x".into()).is_feed_failure());
        assert!(FeedsyncError::NoItemsFound("x".into()).is_feed_failure());
        assert!(FeedsyncError::Validation("x".into()).is_feed_failure());
        assert!(!FeedsyncError::Database("x".into()).is_feed_failure());
        assert!(!FeedsyncError::Persist("x".into()).is_feed_failure());
    }
}
