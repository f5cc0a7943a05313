//! Feed fetcher.
//!
//! Retrieves a remote feed document as text. Requests look like a browser
//! (many feed hosts refuse anything else), URLs pointing at private networks
//! are refused, and an HTML page served in place of a feed is reported as
//! [`FeedsyncError::NotAFeed`] rather than parsed into zero items.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::{FeedsyncError, Result};

/// Source of raw feed documents.
///
/// The pipeline only depends on this trait; [`HttpFeedFetcher`] is the
/// network implementation.
#[async_trait]
pub trait FeedFetch: Send + Sync {
    /// Fetch the raw document at `url`.
    ///
    /// Fails with [`FeedsyncError::Fetch`] on transport or HTTP errors.
    async fn fetch_raw(&self, url: &str) -> Result<String>;
}

/// Fetch a document and make sure it is not an HTML page.
pub async fn fetch_document(fetcher: &dyn FeedFetch, url: &str) -> Result<String> {
    debug!("Fetching feed {}", url);
    let body = fetcher.fetch_raw(url).await?;
    ensure_feed_document(url, &body)?;
    Ok(body)
}

/// Reject documents that are HTML pages.
///
/// The check looks at the trimmed, lowercased start of the body only.
pub fn ensure_feed_document(url: &str, body: &str) -> Result<()> {
    let head: String = body
        .trim_start_matches('\u{feff}')
        .trim_start()
        .chars()
        .take(16)
        .collect::<String>()
        .to_lowercase();

    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        return Err(FeedsyncError::NotAFeed(format!(
            "{url} returned a web page instead of a feed. \
             Use the feed address instead, which usually ends in /feed, /rss or .xml"
        )));
    }
    Ok(())
}

/// HTTP feed fetcher.
pub struct HttpFeedFetcher {
    client: Client,
    max_feed_size: u64,
    allow_private_hosts: bool,
}

impl HttpFeedFetcher {
    /// Create a fetcher from configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let accept = HeaderValue::from_str(&config.accept)
            .map_err(|e| FeedsyncError::Config(format!("invalid accept header: {}", e)))?;
        headers.insert(ACCEPT, accept);

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| FeedsyncError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
            allow_private_hosts: config.allow_private_hosts,
        })
    }
}

#[async_trait]
impl FeedFetch for HttpFeedFetcher {
    async fn fetch_raw(&self, url: &str) -> Result<String> {
        validate_url(url, self.allow_private_hosts)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedsyncError::Fetch(format!("failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(FeedsyncError::Fetch(format!(
                "HTTP error from {}: {}",
                url,
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(FeedsyncError::Fetch(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedsyncError::Fetch(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(FeedsyncError::Fetch(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Validate a feed URL before fetching it.
///
/// Only http and https are accepted. Unless `allow_private_hosts` is set,
/// loopback, private, and link-local addresses and local hostnames are refused.
pub fn validate_url(url: &str, allow_private_hosts: bool) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| FeedsyncError::Validation(format!("invalid URL: {}", e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FeedsyncError::Validation(format!(
            "unsupported URL scheme: {}",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host()
        .ok_or_else(|| FeedsyncError::Validation("URL has no host".to_string()))?;

    if allow_private_hosts {
        return Ok(());
    }

    let refused = match host {
        url::Host::Domain(domain) => is_local_hostname(domain),
        url::Host::Ipv4(ip) => is_private_ip(&IpAddr::V4(ip)),
        url::Host::Ipv6(ip) => is_private_ip(&IpAddr::V6(ip)),
    };

    if refused {
        return Err(FeedsyncError::Validation(format!(
            "feed host not allowed: {}",
            host
        )));
    }
    Ok(())
}

fn is_local_hostname(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "localhost"
        || [".localhost", ".local", ".internal", ".lan", ".home"]
            .iter()
            .any(|suffix| host.ends_with(suffix))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.is_documentation()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80 // link-local
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        }
    }
}
