//! HTTP fetcher implementation
//!
//! This module handles all plain HTTP requests made by the harvester:
//! - Building the shared client with the configured user agent
//! - GET requests for detail page markup
//! - GET requests for image bytes along with their declared content type
//!
//! Every request carries a fixed wall-clock timeout. A timeout or non-2xx
//! status is reported as that request's failure; nothing here retries.

use crate::config::HttpConfig;
use crate::{HarvestError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use std::time::Duration;

/// An image body and the content type the server declared for it
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::HttpConfig;
/// use catalog_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page and returns its body as text
pub async fn fetch_html(client: &Client, url: &str, timeout: Duration) -> Result<String> {
    let response = send(client, url, timeout).await?;
    response
        .text()
        .await
        .map_err(|e| HarvestError::from_reqwest(url, e))
}

/// Fetches an image and returns its bytes with the declared content type
pub async fn fetch_image(client: &Client, url: &str, timeout: Duration) -> Result<FetchedImage> {
    let response = send(client, url, timeout).await?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| HarvestError::from_reqwest(url, e))?;

    Ok(FetchedImage {
        bytes: bytes.to_vec(),
        content_type,
    })
}

/// Sends a GET and rejects non-2xx responses
async fn send(client: &Client, url: &str, timeout: Duration) -> Result<Response> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| HarvestError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response)
}
