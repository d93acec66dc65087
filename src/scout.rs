use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::ScoutConfig;
use crate::models::{OutputFormat, ScrapeOutcome};
use crate::output::write_outputs;
use crate::scrapers::{BrowserStrategy, FetchStrategy, HttpStrategy, SampleStrategy};

/// Walks the fetch strategies in order until one yields listings, then
/// turns the result into download artifacts
pub struct MarketScout {
    config: Arc<ScoutConfig>,
    strategies: Vec<Box<dyn FetchStrategy>>,
}

impl MarketScout {
    /// Standard strategy ladder: plain HTTP, then a headless browser, then
    /// placeholder data so a run never comes back empty-handed.
    pub fn new(config: Arc<ScoutConfig>) -> Self {
        let strategies: Vec<Box<dyn FetchStrategy>> = vec![
            Box::new(HttpStrategy::new(Arc::clone(&config))),
            Box::new(BrowserStrategy::new(Arc::clone(&config))),
            Box::new(SampleStrategy::new(Arc::clone(&config))),
        ];
        Self { config, strategies }
    }

    /// Custom strategy ladder. Lets tests swap the network-bound rungs out.
    pub fn with_strategies(
        config: Arc<ScoutConfig>,
        strategies: Vec<Box<dyn FetchStrategy>>,
    ) -> Self {
        Self { config, strategies }
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    /// Run one scrape end to end: fetch listings, then write the requested
    /// artifacts into the downloads directory.
    pub async fn run(
        &self,
        query: &str,
        pages: u32,
        format: OutputFormat,
    ) -> Result<ScrapeOutcome> {
        let pages = pages.min(self.config.max_pages);
        info!("Scraping '{}' across up to {} pages", query, pages);

        let mut listings = Vec::new();
        for strategy in &self.strategies {
            match strategy.fetch(query, pages).await {
                Ok(found) if !found.is_empty() => {
                    info!(
                        "Strategy '{}' returned {} listings",
                        strategy.name(),
                        found.len()
                    );
                    listings = found;
                    break;
                }
                Ok(_) => {
                    warn!(
                        "Strategy '{}' found nothing, trying the next one",
                        strategy.name()
                    );
                }
                Err(err) => {
                    warn!("Strategy '{}' failed: {}", strategy.name(), err);
                }
            }
        }

        let files = write_outputs(&self.config, query, &listings, format).await?;

        Ok(ScrapeOutcome { listings, files })
    }
}
