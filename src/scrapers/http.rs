use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::ScoutConfig;
use crate::error::ScrapeError;
use crate::models::Listing;
use crate::scrapers::extract::parse_listing_page;
use crate::scrapers::traits::FetchStrategy;

/// Plain HTTP fetch strategy: paginated GETs with a rotating browser identity
pub struct HttpStrategy {
    config: Arc<ScoutConfig>,
}

impl HttpStrategy {
    pub fn new(config: Arc<ScoutConfig>) -> Self {
        Self { config }
    }

    /// Each run gets its own client, and idle connections are never kept,
    /// so every page request travels on a fresh session.
    fn build_client(&self) -> Result<Client, ScrapeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.http_timeout_secs))
            // the site serves stale certs on some edge nodes
            .danger_accept_invalid_certs(true)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(client)
    }

    /// Header set of a mainstream desktop browser. The user agent is drawn
    /// fresh from the pool on every call.
    ///
    /// Accept-Encoding is left to the client so response decompression
    /// keeps working.
    fn identity_headers(&self) -> HeaderMap {
        let site = &self.config.site;
        let mut headers = HeaderMap::new();

        if let Ok(value) = HeaderValue::from_str(site.random_user_agent()) {
            headers.insert(header::USER_AGENT, value);
        }
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(
            HeaderName::from_static("sec-ch-ua"),
            HeaderValue::from_static("\"Chromium\";v=\"115\", \"Not/A)Brand\";v=\"99\""),
        );
        headers.insert(
            HeaderName::from_static("sec-ch-ua-mobile"),
            HeaderValue::from_static("?0"),
        );
        headers.insert(
            HeaderName::from_static("sec-ch-ua-platform"),
            HeaderValue::from_static("\"Windows\""),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-dest"),
            HeaderValue::from_static("document"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-mode"),
            HeaderValue::from_static("navigate"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-site"),
            HeaderValue::from_static("none"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-user"),
            HeaderValue::from_static("?1"),
        );
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );
        if let Ok(value) = HeaderValue::from_str(&site.referer) {
            headers.insert(header::REFERER, value);
        }

        headers
    }
}

#[async_trait]
impl FetchStrategy for HttpStrategy {
    async fn fetch(&self, query: &str, max_pages: u32) -> Result<Vec<Listing>, ScrapeError> {
        let site = &self.config.site;
        let client = self.build_client()?;
        let mut collected: Vec<Listing> = Vec::new();

        for page_num in 1..=max_pages {
            let url = site.search_url(query, page_num);

            self.config.delays.before_request.wait().await;

            info!("Requesting: {}", url);
            let response = match client
                .get(&url)
                .headers(self.identity_headers())
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    if collected.is_empty() {
                        return Err(err.into());
                    }
                    warn!("Request error on page {}: {}", page_num, err);
                    break;
                }
            };

            let status = response.status();
            if status != StatusCode::OK {
                if collected.is_empty() {
                    return Err(ScrapeError::Status(status));
                }
                warn!("Failed to fetch page {}: status code {}", page_num, status);
                break;
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    if collected.is_empty() {
                        return Err(err.into());
                    }
                    warn!("Failed to read page {}: {}", page_num, err);
                    break;
                }
            };
            debug!("Downloaded {} bytes of HTML", body.len());

            let parsed = parse_listing_page(&body, site);

            if let Some(marker) = parsed.blocked {
                if collected.is_empty() {
                    return Err(ScrapeError::Blocked(marker));
                }
                warn!("Detected anti-bot measures on page {}", page_num);
                break;
            }

            if parsed.listings.is_empty() {
                warn!("No listings found on page {}", page_num);
            } else {
                info!("Found {} listings on page {}", parsed.listings.len(), page_num);
                collected.extend(parsed.listings);
            }

            if !parsed.has_more {
                info!("No next page button found");
                break;
            }

            self.config.delays.between_pages.wait().await;
        }

        Ok(collected)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
