//! Remote crawl provider
//!
//! This module handles the call to the hosted crawl service, including:
//! - Building the HTTP client with an explicit request timeout
//! - Posting the site URL and page limit
//! - Buffering the response body up to a size bound
//! - Parsing the single JSON payload into crawled pages
//!
//! Any failure here is reported as a `ProviderError` and counts as one failed
//! attempt for the site; no pages from a failed call are processed.

use crate::config::ProviderConfig;
use crate::ProviderError;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One page returned by the crawl provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrawledPage {
    /// Exact URL of the page
    pub url: String,
    /// Raw markup; absent when the provider could not retrieve the page
    #[serde(default)]
    pub content: Option<String>,
}

/// A source of crawled pages for a site
#[async_trait]
pub trait CrawlProvider: Send + Sync {
    /// Crawls up to `page_limit` pages starting from `site_url`
    ///
    /// Pages are returned in the order the provider produced them.
    async fn crawl(&self, site_url: &str, page_limit: u32)
        -> Result<Vec<CrawledPage>, ProviderError>;
}

#[derive(Debug, Serialize)]
struct CrawlRequest<'a> {
    url: &'a str,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct CrawlResponse {
    items: Vec<CrawledPage>,
}

/// Builds an HTTP client for provider calls
///
/// The overall timeout bounds a whole crawl call, including reading the body.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let user_agent = format!("corpus-sieve/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(30))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP client for a Spider-compatible crawl endpoint
pub struct SpiderClient {
    client: Client,
    endpoint: String,
    api_key: String,
    max_response_bytes: usize,
}

impl SpiderClient {
    /// Creates a client from provider configuration and a resolved API key
    ///
    /// # Example
    ///
    /// ```no_run
    /// use corpus_sieve::config::ProviderConfig;
    /// use corpus_sieve::crawler::SpiderClient;
    ///
    /// let config = ProviderConfig {
    ///     endpoint: "https://api.spider.cloud/crawl".to_string(),
    ///     api_key_env: "SPIDER_API_KEY".to_string(),
    ///     page_limit: 500,
    ///     timeout_secs: 300,
    ///     max_response_bytes: 256 * 1024 * 1024,
    /// };
    ///
    /// let client = SpiderClient::new(&config, "secret".to_string()).unwrap();
    /// ```
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self, reqwest::Error> {
        let client = build_http_client(Duration::from_secs(config.timeout_secs))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            max_response_bytes: config.max_response_bytes,
        })
    }
}

#[async_trait]
impl CrawlProvider for SpiderClient {
    async fn crawl(
        &self,
        site_url: &str,
        page_limit: u32,
    ) -> Result<Vec<CrawledPage>, ProviderError> {
        tracing::debug!("Requesting crawl of {} (limit {})", site_url, page_limit);

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, &self.api_key)
            .json(&CrawlRequest {
                url: site_url,
                limit: page_limit,
            })
            .send()
            .await
            .map_err(|source| ProviderError::Http {
                url: site_url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                url: site_url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = read_bounded(response, self.max_response_bytes, site_url).await?;
        let pages = parse_payload(&body, site_url)?;

        tracing::debug!("Provider returned {} pages for {}", pages.len(), site_url);
        Ok(pages)
    }
}

/// Accumulates the response body, refusing to grow past `limit` bytes
async fn read_bounded(
    mut response: Response,
    limit: usize,
    site_url: &str,
) -> Result<Vec<u8>, ProviderError> {
    let mut buffer = Vec::new();

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|source| ProviderError::Http {
            url: site_url.to_string(),
            source,
        })?
    {
        if buffer.len() + chunk.len() > limit {
            return Err(ProviderError::TooLarge {
                url: site_url.to_string(),
                limit,
            });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer)
}

/// Parses one complete JSON object and extracts its `items` array
fn parse_payload(body: &[u8], site_url: &str) -> Result<Vec<CrawledPage>, ProviderError> {
    let response: CrawlResponse =
        serde_json::from_slice(body).map_err(|e| ProviderError::Malformed {
            url: site_url.to_string(),
            message: e.to_string(),
        })?;
    Ok(response.items)
}
