//! Validation utilities for request DTOs.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::web::error::ApiError;

/// A JSON extractor that validates the request body.
///
/// Deserialization failures are reported as 400, validation failures as 422
/// with field-level details.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e)))?;

        value.validate().map_err(ApiError::from_validation_errors)?;

        Ok(ValidatedJson(value))
    }
}

// ============================================================================
// Custom Validators
// ============================================================================

/// Validate that a string does not contain control characters or NULL bytes.
pub fn no_control_chars(value: &str) -> Result<(), ValidationError> {
    if value.chars().any(|c| c.is_control()) {
        return Err(ValidationError::new("no_control_chars")
            .with_message("Must not contain control characters".into()));
    }
    Ok(())
}

/// Validate an http(s) feed URL; the empty string is allowed.
pub fn feed_url_or_empty(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }

    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(()),
        _ => Err(ValidationError::new("feed_url")
            .with_message("Must be an http or https URL".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_control_chars() {
        assert!(no_control_chars("https://example.com/feed").is_ok());
        assert!(no_control_chars("https://example.com/\x00feed").is_err());
        assert!(no_control_chars("https://example.com/\nfeed").is_err());
    }

    #[test]
    fn test_feed_url_or_empty() {
        assert!(feed_url_or_empty("").is_ok());
        assert!(feed_url_or_empty("   ").is_ok());
        assert!(feed_url_or_empty("https://example.com/feed.xml").is_ok());
        assert!(feed_url_or_empty("http://example.com/rss").is_ok());

        assert!(feed_url_or_empty("example.com/feed").is_err());
        assert!(feed_url_or_empty("ftp://example.com/feed").is_err());
        assert!(feed_url_or_empty("javascript:alert(1)").is_err());
    }
}
