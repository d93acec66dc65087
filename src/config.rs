use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::scrapers::delay::DelayPolicy;

/// Runtime settings for the scout service.
///
/// Every field has a compiled-in default aimed at OLX India; a JSON file
/// can override any subset of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub site: SiteProfile,
    pub delays: DelayPolicy,
    /// Address the HTTP API binds to
    pub bind_addr: String,
    /// Directory scrape artifacts are written to
    pub downloads_dir: String,
    /// Directory debug screenshots land in
    pub debug_dir: String,
    /// Hard ceiling on pages per run, whatever the client asks for
    pub max_pages: u32,
    pub http_timeout_secs: u64,
    pub browser_nav_timeout_secs: u64,
    pub headless: bool,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            site: SiteProfile::default(),
            delays: DelayPolicy::default(),
            bind_addr: "127.0.0.1:5000".to_string(),
            downloads_dir: "static/downloads".to_string(),
            debug_dir: "debug".to_string(),
            max_pages: 10,
            http_timeout_secs: 30,
            browser_nav_timeout_secs: 60,
            headless: true,
        }
    }
}

impl ScoutConfig {
    /// Load from a JSON file, falling back to the defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}

/// Everything site-specific: URLs, request identity, selector table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    /// Short name used as the filename prefix for artifacts
    pub slug: String,
    pub base_url: String,
    /// Search path with a `{query}` placeholder for the encoded query
    pub search_path: String,
    /// Query-string parameter carrying the page number
    pub page_param: String,
    pub referer: String,
    pub user_agents: Vec<String>,
    /// Lowercase substrings that mark an anti-bot interstitial
    pub block_markers: Vec<String>,
    pub selectors: SelectorTable,
    pub fingerprint: BrowserFingerprint,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            slug: "olx".to_string(),
            base_url: "https://www.olx.in".to_string(),
            search_path: "/items/q-{query}".to_string(),
            page_param: "page".to_string(),
            referer: "https://www.google.com/".to_string(),
            user_agents: owned(&[
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Safari/605.1.15",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/113.0",
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36",
            ]),
            block_markers: owned(&["captcha", "blocked", "suspicious"]),
            selectors: SelectorTable::default(),
            fingerprint: BrowserFingerprint::default(),
        }
    }
}

impl SiteProfile {
    /// Search results URL for a query and 1-based page number.
    pub fn search_url(&self, query: &str, page: u32) -> String {
        let encoded = urlencoding::encode(query);
        let path = self.search_path.replace("{query}", &encoded);
        format!("{}{}?{}={}", self.base_url, path, self.page_param, page)
    }

    pub fn random_user_agent(&self) -> &str {
        use rand::seq::SliceRandom;
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or("Mozilla/5.0")
    }
}

/// Ordered CSS selector lists per listing field.
///
/// Earlier entries match the current site markup; later ones are fallbacks
/// for older layouts that still show up on some result pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorTable {
    /// Listing card containers on a result page
    pub listing: Vec<String>,
    pub title: Vec<String>,
    pub price: Vec<String>,
    pub location: Vec<String>,
    pub date: Vec<String>,
    pub seller: Vec<String>,
    pub link: Vec<String>,
    pub image: Vec<String>,
    /// Pagination control whose presence means more pages exist
    pub load_more: Vec<String>,
}

impl Default for SelectorTable {
    fn default() -> Self {
        Self {
            listing: owned(&[
                "li[data-aut-id=\"itemBox\"]",
                "li.EIR5N",
                "li._1DNjI",
                "li[data-testid=\"listing-card\"]",
                "div.IKo3_",
                "div._2tW1I",
            ]),
            title: owned(&["[data-aut-id=\"itemTitle\"]", "span.fTZT3", ".IKo3_", "h2"]),
            price: owned(&[
                "[data-aut-id=\"itemPrice\"]",
                "span.rui-1ZsCJ",
                ".mNKEw",
                "span._2Vp0i",
            ]),
            location: owned(&[
                "[data-aut-id=\"item-location\"]",
                "span.tjgMj",
                "._1KOFM",
                "span._2VQu4",
            ]),
            date: owned(&[
                "[data-aut-id=\"item-date\"]",
                "span._2Vp0i",
                "._2DGqt",
                "span._3XHzl",
            ]),
            seller: owned(&[
                "[data-aut-id=\"seller-name\"]",
                "span._3KMlK",
                "._3eNLO",
                "span._1KQyH",
            ]),
            link: owned(&["a"]),
            image: owned(&[
                "img[data-aut-id=\"itemImage\"]",
                "img",
                "[data-aut-id=\"slider\"] img",
            ]),
            load_more: owned(&[
                "a[data-aut-id=\"btnLoadMore\"]",
                "button.rui-3sH3b",
                ".rui-77FWl",
            ]),
        }
    }
}

/// Stable identity the headless browser presents to the site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserFingerprint {
    pub locale: String,
    pub timezone: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accept_language: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for BrowserFingerprint {
    fn default() -> Self {
        Self {
            locale: "en-IN".to_string(),
            timezone: "Asia/Kolkata".to_string(),
            latitude: 20.5937,
            longitude: 78.9629,
            accept_language: "en-US,en;q=0.9,hi;q=0.8".to_string(),
            viewport_width: 1366,
            viewport_height: 768,
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
