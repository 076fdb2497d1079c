//! Price-board image client
//!
//! Fetches the published price-board PNG for a station. Non-success HTTP
//! statuses are a normal outcome and are returned as data; only transport
//! failures (timeouts, connection errors) are errors.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::data::StationId;

/// Base URL of the price-board image service
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://tankservice.app-it-up.com/Tankservice/v1/places";

/// Default upper bound on a single image request
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Longest part of a refusal body kept in the log
const MAX_LOGGED_BODY_CHARS: usize = 200;

/// Browser identities rotated across requests
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Errors that can occur when fetching a price board
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed before a status was received
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Response of the image source for a station
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResponse {
    /// The board image bytes (HTTP 200)
    Image(Vec<u8>),
    /// Any other HTTP status
    Status(u16),
}

/// Source of price-board images
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, station_id: &StationId) -> Result<FetchResponse, FetchError>;
}

/// Client for the price-board image service
#[derive(Debug)]
pub struct PriceBoardClient {
    client: Client,
    base_url: String,
    next_agent: AtomicUsize,
}

impl PriceBoardClient {
    /// Creates a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            next_agent: AtomicUsize::new(0),
        })
    }

    /// URL of the board image for a station
    pub fn image_url(&self, station_id: &StationId) -> String {
        format!("{}/{}.png", self.base_url, station_id)
    }

    /// Browser identity for the next request, cycling through the list
    fn next_user_agent(&self) -> &'static str {
        let index = self.next_agent.fetch_add(1, Ordering::Relaxed) % USER_AGENTS.len();
        USER_AGENTS[index]
    }

    /// Request headers presenting as `user_agent`
    fn headers(user_agent: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("image/avif,image/webp,image/png,image/*;q=0.8,*/*;q=0.5"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("nl-NL,nl;q=0.9,en;q=0.6"));
        headers
    }
}

#[async_trait]
impl ImageSource for PriceBoardClient {
    async fn fetch(&self, station_id: &StationId) -> Result<FetchResponse, FetchError> {
        let url = self.image_url(station_id);
        let user_agent = self.next_user_agent();
        let response = self
            .client
            .get(&url)
            .headers(Self::headers(user_agent))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            // The body is only wanted for the log; a failed read leaves it empty
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                %url,
                status = status.as_u16(),
                user_agent,
                body = %truncate_body(&body, MAX_LOGGED_BODY_CHARS),
                "price board request refused"
            );
            return Ok(FetchResponse::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        tracing::debug!(%url, bytes = bytes.len(), "fetched price board");
        Ok(FetchResponse::Image(bytes.to_vec()))
    }
}

/// Shortens a response body to at most `max_chars` characters
fn truncate_body(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}
