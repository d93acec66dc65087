use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::{Emulation, Page};
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{BrowserFingerprint, ScoutConfig};
use crate::error::ScrapeError;
use crate::models::Listing;
use crate::scrapers::extract::{detect_visible_block, parse_listing_page};
use crate::scrapers::traits::FetchStrategy;

/// Flags Chrome is launched with so automation probes come up empty
const BROWSER_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
    "--hide-scrollbars",
    "--mute-audio",
];

/// Injected before any page script runs, so fingerprint probes see a
/// plain desktop browser.
const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', {
    get: () => false
});

Object.defineProperty(navigator, 'plugins', {
    get: () => [1, 2, 3, 4, 5],
});

Object.defineProperty(navigator, 'languages', {
    get: () => ['en-US', 'en', 'hi'],
});
"#;

/// Headless-browser fetch strategy, used when plain HTTP comes back
/// empty or blocked
pub struct BrowserStrategy {
    config: Arc<ScoutConfig>,
}

impl BrowserStrategy {
    pub fn new(config: Arc<ScoutConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl FetchStrategy for BrowserStrategy {
    async fn fetch(&self, query: &str, max_pages: u32) -> Result<Vec<Listing>, ScrapeError> {
        let config = Arc::clone(&self.config);
        let query = query.to_owned();

        // headless_chrome drives Chrome over a blocking websocket
        tokio::task::spawn_blocking(move || fetch_blocking(&config, &query, max_pages))
            .await
            .map_err(|err| ScrapeError::Browser(format!("browser task failed: {err}")))?
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

fn fetch_blocking(
    config: &ScoutConfig,
    query: &str,
    max_pages: u32,
) -> Result<Vec<Listing>, ScrapeError> {
    let site = &config.site;

    info!("Launching headless Chrome...");
    let browser = launch_browser(config).map_err(browser_err)?;
    let tab = browser.new_tab().map_err(browser_err)?;
    tab.set_default_timeout(Duration::from_secs(config.browser_nav_timeout_secs));

    let user_agent = site.random_user_agent();
    tab.set_user_agent(user_agent, Some(&site.fingerprint.accept_language), None)
        .map_err(browser_err)?;

    if let Err(err) = install_fingerprint(&tab, &site.fingerprint) {
        warn!("Could not install browser fingerprint: {}", err);
    }

    // Visit the homepage first so the session starts the way a person's would
    info!("Visiting homepage first: {}", site.base_url);
    match tab
        .navigate_to(&site.base_url)
        .and_then(|tab| tab.wait_until_navigated())
    {
        Ok(_) => {
            config.delays.page_settle.wait_blocking();
            let session = Uuid::new_v4().simple().to_string();
            if let Err(err) = tab.evaluate(&session_cookie_script(&session), false) {
                warn!("Could not set session cookie: {}", err);
            }
        }
        Err(err) => warn!("Error visiting homepage: {}", err),
    }

    let mut collected: Vec<Listing> = Vec::new();

    for page_num in 1..=max_pages {
        let url = site.search_url(query, page_num);
        info!("Navigating to: {}", url);

        if let Err(err) = tab
            .navigate_to(&url)
            .and_then(|tab| tab.wait_until_navigated())
        {
            if collected.is_empty() {
                return Err(ScrapeError::Browser(format!(
                    "navigation to page {page_num} failed: {err:#}"
                )));
            }
            warn!("Error on page {}: {}", page_num, err);
            break;
        }

        // give client-side rendering time to paint the result grid
        config.delays.page_settle.wait_blocking();

        let html = match tab.get_content() {
            Ok(html) => html,
            Err(err) => {
                if collected.is_empty() {
                    return Err(ScrapeError::Browser(format!(
                        "could not read page {page_num}: {err:#}"
                    )));
                }
                warn!("Error reading page {}: {}", page_num, err);
                break;
            }
        };

        // Check the rendered text for block markers before looking for listings
        if let Some(marker) = detect_visible_block(&html, site) {
            if collected.is_empty() {
                return Err(ScrapeError::Blocked(marker));
            }
            warn!("Anti-bot protection detected, stopping");
            break;
        }

        let parsed = parse_listing_page(&html, site);

        if parsed.listings.is_empty() {
            warn!("No listings found on page {}", page_num);
            save_debug_screenshot(&tab, &config.debug_dir, page_num);
            continue;
        }

        info!("Found {} listings on page {}", parsed.listings.len(), page_num);
        collected.extend(parsed.listings);

        config.delays.browser_paging.wait_blocking();
    }

    Ok(collected)
}

fn browser_err(err: anyhow::Error) -> ScrapeError {
    ScrapeError::Browser(format!("{err:#}"))
}

fn launch_browser(config: &ScoutConfig) -> Result<Browser> {
    let fingerprint = &config.site.fingerprint;
    let options = LaunchOptions::default_builder()
        .headless(config.headless)
        .sandbox(false)
        .window_size(Some((
            fingerprint.viewport_width,
            fingerprint.viewport_height,
        )))
        .idle_browser_timeout(Duration::from_secs(90))
        .args(BROWSER_ARGS.iter().map(OsStr::new).collect())
        .build()
        .context("Failed to build launch options")?;

    Browser::new(options).context("Failed to launch Chrome browser")
}

/// Pin locale, timezone and geolocation to one plausible Indian visitor
/// and register the stealth script for every new document.
fn install_fingerprint(tab: &Tab, fingerprint: &BrowserFingerprint) -> Result<()> {
    tab.call_method(Page::AddScriptToEvaluateOnNewDocument {
        source: STEALTH_SCRIPT.to_string(),
        world_name: None,
        include_command_line_api: None,
        run_immediately: None,
    })?;
    tab.call_method(Emulation::SetTimezoneOverride {
        timezone_id: fingerprint.timezone.clone(),
    })?;
    tab.call_method(Emulation::SetLocaleOverride {
        locale: Some(fingerprint.locale.clone()),
    })?;
    tab.call_method(geolocation_override(fingerprint))?;
    Ok(())
}

/// Coordinate overrides for the CDP call; options we do not spoof stay `None`.
fn geolocation_override(fingerprint: &BrowserFingerprint) -> Emulation::SetGeolocationOverride {
    Emulation::SetGeolocationOverride {
        latitude: Some(fingerprint.latitude),
        longitude: Some(fingerprint.longitude),
        accuracy: Some(100.0),
        altitude: None,
        altitude_accuracy: None,
        heading: None,
        speed: None,
    }
}

fn session_cookie_script(session: &str) -> String {
    format!("document.cookie = \"session_id={session}; path=/\";")
}

fn save_debug_screenshot(tab: &Tab, debug_dir: &str, page_num: u32) {
    let capture = tab
        .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
        .and_then(|png| {
            std::fs::create_dir_all(debug_dir)?;
            let path = Path::new(debug_dir).join(format!("debug_screenshot_page{page_num}.png"));
            std::fs::write(&path, png)?;
            Ok(path)
        });

    match capture {
        Ok(path) => info!("Saved screenshot to {}", path.display()),
        Err(err) => warn!("Could not capture screenshot: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stealth_script_masks_the_obvious_probes() {
        assert!(STEALTH_SCRIPT.contains("'webdriver'"));
        assert!(STEALTH_SCRIPT.contains("'plugins'"));
        assert!(STEALTH_SCRIPT.contains("'languages'"));
    }

    #[test]
    fn launch_flags_disable_automation_markers() {
        assert!(BROWSER_ARGS
            .iter()
            .any(|arg| arg.contains("AutomationControlled")));
    }

    #[test]
    fn session_cookie_script_sets_the_id() {
        let script = session_cookie_script("abc123");
        assert_eq!(script, "document.cookie = \"session_id=abc123; path=/\";");
    }

    #[test]
    fn geolocation_override_pins_only_the_coordinates() {
        let fingerprint = BrowserFingerprint::default();
        let params = geolocation_override(&fingerprint);

        assert_eq!(params.latitude, Some(fingerprint.latitude));
        assert_eq!(params.longitude, Some(fingerprint.longitude));
        assert_eq!(params.accuracy, Some(100.0));
        assert!(params.altitude.is_none());
        assert!(params.altitude_accuracy.is_none());
        assert!(params.heading.is_none());
        assert!(params.speed.is_none());
    }
}
